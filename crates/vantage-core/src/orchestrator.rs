//! Run orchestration.
//!
//! A run has a synchronous build phase (validate, expand, resolve, prune)
//! followed by the async execution phase. Every build error surfaces before
//! the driver is touched.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::aggregate::{Aggregator, WeightedAggregator};
use crate::config::{Config, Flags, RunOptions};
use crate::driver::Driver;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::obs;
use crate::plan::RunPlan;
use crate::pruner::prune;
use crate::registry::CapabilityRegistry;
use crate::report::{Report, ReportBody};
use crate::resolver::required_gatherers;
use crate::runner::PipelineRunner;

/// Entry point for audit runs.
///
/// Holds no per-run state; one orchestrator can serve concurrent runs.
pub struct Orchestrator<'r> {
    registry: &'r CapabilityRegistry,
    driver: Arc<dyn Driver>,
    aggregator: Arc<dyn Aggregator>,
}

impl Orchestrator<'static> {
    /// Orchestrator over the builtin catalog with the weighted aggregator.
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            registry: CapabilityRegistry::builtin(),
            driver,
            aggregator: Arc::new(WeightedAggregator),
        }
    }
}

impl<'r> Orchestrator<'r> {
    pub fn with_registry<'s>(self, registry: &'s CapabilityRegistry) -> Orchestrator<'s> {
        Orchestrator {
            registry,
            driver: self.driver,
            aggregator: self.aggregator,
        }
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn Aggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        self.registry
    }

    /// Build the plan a run would execute, without collecting anything.
    pub fn plan(&self, config: &Config, flags: &Flags) -> Result<RunPlan> {
        let validated = config.validate()?;

        let audits = self
            .registry
            .filter_and_expand(validated.audits, flags.audit_whitelist.as_ref())?;
        let required = required_gatherers(&audits);
        let passes = prune(validated.passes, &required, self.registry)?;

        let configured: usize = validated.passes.iter().map(|p| p.gatherers.len()).sum();
        let scheduled: usize = passes.iter().map(|p| p.gatherers.len()).sum();
        METRICS.add_gatherers_pruned(configured.saturating_sub(scheduled) as u64);
        for index in 0..validated.passes.len() {
            if !passes.iter().any(|p| p.index == index) {
                METRICS.inc_passes_dropped();
                obs::emit_pass_dropped(index);
            }
        }

        let plan = RunPlan::new(passes, audits, required);
        obs::emit_plan_built(plan.passes.len(), scheduled, plan.audits.len(), &plan.digest);
        Ok(plan)
    }

    /// Run the full pipeline against `url`.
    ///
    /// `flags` is merged over the defaults into fresh [`RunOptions`]; the
    /// caller's values are never modified.
    pub async fn run(&self, url: &str, flags: &Flags, config: &Config) -> Result<Report> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id, url);
        self.run_with_id(run_id, url, flags, config)
            .instrument(span)
            .await
    }

    async fn run_with_id(
        &self,
        run_id: String,
        url: &str,
        flags: &Flags,
        config: &Config,
    ) -> Result<Report> {
        let start = Instant::now();
        METRICS.inc_runs_started();
        obs::emit_run_started(&run_id, url);

        match self.execute(&run_id, url, flags, config).await {
            Ok((report, audits, failed)) => {
                obs::emit_run_finished(&run_id, start.elapsed().as_millis() as u64, audits, failed);
                Ok(report)
            }
            Err(err) => {
                METRICS.inc_runs_failed();
                obs::emit_run_failed(&run_id, &err);
                Err(err)
            }
        }
    }

    /// Returns the report with the audit and failed-audit counts.
    async fn execute(
        &self,
        run_id: &str,
        url: &str,
        flags: &Flags,
        config: &Config,
    ) -> Result<(Report, usize, usize)> {
        let options = RunOptions::resolve(url, flags);
        let plan = self.plan(config, flags)?;
        debug!(mobile = options.mobile, load_page = options.load_page, "options resolved");

        let outcome = PipelineRunner::new(self.driver.as_ref(), self.aggregator.as_ref())
            .execute(&plan, &options, config.aggregations.as_deref())
            .await?;
        let audits = outcome.audit_results.len();
        let failed = outcome.failed_audits();

        let body = match outcome.aggregations {
            Some(aggregations) => ReportBody::Aggregations { aggregations },
            None => ReportBody::AuditResults {
                audit_results: outcome.audit_results,
            },
        };

        let report = Report {
            url: options.url,
            run_id: run_id.to_string(),
            generated_at: Utc::now(),
            plan_digest: plan.digest,
            body,
        };
        Ok((report, audits, failed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Pass;
    use crate::driver::Artifacts;
    use crate::error::PipelineError;
    use crate::fakes::FixtureDriver;
    use serde_json::json;

    fn config(passes: Vec<Pass>, audits: &[&str]) -> Config {
        Config::new(passes, audits.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn test_plan_prunes_and_expands() {
        let orchestrator = Orchestrator::new(Arc::new(FixtureDriver::default()));
        let plan = orchestrator
            .plan(
                &config(
                    vec![
                        Pass::new(["url", "https"]),
                        Pass::new(["screen-timings"]),
                    ],
                    &["is-on-https"],
                ),
                &Flags::default(),
            )
            .unwrap();

        assert_eq!(plan.scheduled_gatherers(), vec!["HTTPS"]);
        assert_eq!(plan.audit_names(), vec!["is-on-https"]);
        assert_eq!(plan.passes[0].pass.gatherers, vec!["https"]);
    }

    #[test]
    fn test_plan_respects_whitelist() {
        let orchestrator = Orchestrator::new(Arc::new(FixtureDriver::default()));
        let plan = orchestrator
            .plan(
                &config(
                    vec![Pass::new(["https", "viewport"])],
                    &["is-on-https", "viewport"],
                ),
                &Flags::default().with_audit_whitelist(["viewport"]),
            )
            .unwrap();
        assert_eq!(plan.audit_names(), vec!["viewport"]);
        assert_eq!(plan.scheduled_gatherers(), vec!["Viewport"]);
    }

    #[tokio::test]
    async fn test_build_error_skips_driver() {
        let driver = Arc::new(FixtureDriver::default());
        let orchestrator = Orchestrator::new(driver.clone());
        let err = orchestrator
            .run(
                "https://example.com",
                &Flags::default(),
                &config(vec![Pass::new(["https", "missingGatherer"])], &["is-on-https"]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnknownGatherer { ref name } if name == "missingGatherer"));
        assert_eq!(driver.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_passes_resolved_options_to_driver() {
        let driver = Arc::new(FixtureDriver::new(
            [("ThemeColor", json!("#000"))].into_iter().collect::<Artifacts>(),
        ));
        let orchestrator = Orchestrator::new(driver.clone());
        let flags = Flags::default().with_load_page(false);
        let report = orchestrator
            .run(
                "https://example.com",
                &flags,
                &config(vec![Pass::new(["theme-color"])], &["theme-color-meta"]),
            )
            .await
            .unwrap();

        let options = driver.last_options().unwrap();
        assert!(options.mobile);
        assert!(!options.load_page);
        assert_eq!(flags.mobile, None);
        assert_eq!(report.url, "https://example.com");
        assert_eq!(report.audit_results().map(<[_]>::len), Some(1));
    }
}
