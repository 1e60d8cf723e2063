//! Plan execution: collect, audit, aggregate.

use std::time::Instant;

use tracing::{debug, info};

use crate::aggregate::{AggregateReport, AggregationRule, Aggregator};
use crate::audit::{run_audits, AuditResult};
use crate::config::RunOptions;
use crate::driver::{Artifacts, CollectionError, Driver};
use crate::error::Result;
use crate::obs;
use crate::plan::RunPlan;

/// Outcome of executing a plan.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub audit_results: Vec<AuditResult>,
    /// Present iff aggregation rules were supplied.
    pub aggregations: Option<AggregateReport>,
}

impl RunOutcome {
    pub fn failed_audits(&self) -> usize {
        self.audit_results.iter().filter(|r| r.is_failure()).count()
    }
}

/// Executes a fixed [`RunPlan`] against a driver.
pub struct PipelineRunner<'a> {
    driver: &'a dyn Driver,
    aggregator: &'a dyn Aggregator,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(driver: &'a dyn Driver, aggregator: &'a dyn Aggregator) -> Self {
        Self { driver, aggregator }
    }

    /// Run the three stages in order.
    ///
    /// Collection and aggregation failures abort the run. Audit failures
    /// are recorded on their results and never abort.
    pub async fn execute(
        &self,
        plan: &RunPlan,
        options: &RunOptions,
        rules: Option<&[AggregationRule]>,
    ) -> Result<RunOutcome> {
        let artifacts = self.collect(plan, options).await?;

        let audit_results = run_audits(&plan.audits, &artifacts);
        debug!(
            audits = audit_results.len(),
            failed = audit_results.iter().filter(|r| r.is_failure()).count(),
            "audits finished"
        );

        let aggregations = match rules {
            Some(rules) => {
                let report = self.aggregator.aggregate(rules, &audit_results)?;
                obs::emit_aggregation_finished(report.categories.len());
                Some(report)
            }
            None => None,
        };

        Ok(RunOutcome {
            audit_results,
            aggregations,
        })
    }

    async fn collect(&self, plan: &RunPlan, options: &RunOptions) -> Result<Artifacts> {
        let start = Instant::now();
        info!(passes = plan.passes.len(), "starting collection");

        let artifacts = self.driver.run(&plan.passes, options).await?;

        if let Some(missing) = plan
            .scheduled_gatherers()
            .into_iter()
            .find(|name| !artifacts.contains(name))
        {
            return Err(CollectionError::MissingArtifact {
                gatherer: missing.to_string(),
            }
            .into());
        }

        obs::emit_collection_finished(artifacts.len(), start.elapsed().as_millis() as u64);
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::WeightedAggregator;
    use crate::config::{Flags, Pass};
    use crate::error::PipelineError;
    use crate::fakes::FixtureDriver;
    use crate::pruner::{prune, PlannedPass};
    use crate::registry::CapabilityRegistry;
    use crate::resolver::required_gatherers;
    use async_trait::async_trait;
    use serde_json::json;

    fn plan(audits: &[&str], passes: &[Pass]) -> RunPlan {
        let registry = CapabilityRegistry::builtin();
        let audits = registry.expand(audits).unwrap();
        let required = required_gatherers(&audits);
        let planned = prune(passes, &required, registry).unwrap();
        RunPlan::new(planned, audits, required)
    }

    fn options() -> RunOptions {
        RunOptions::resolve("https://example.com", &Flags::default())
    }

    struct ForgetfulDriver;

    #[async_trait]
    impl Driver for ForgetfulDriver {
        async fn run(
            &self,
            _passes: &[PlannedPass],
            _options: &RunOptions,
        ) -> std::result::Result<Artifacts, CollectionError> {
            Ok(Artifacts::new())
        }
    }

    #[tokio::test]
    async fn test_audits_see_collected_artifacts() {
        let driver = FixtureDriver::new(
            [("HTTPS", json!({ "value": true }))].into_iter().collect(),
        );
        let plan = plan(&["is-on-https"], &[Pass::new(["https", "viewport"])]);
        let outcome = PipelineRunner::new(&driver, &WeightedAggregator)
            .execute(&plan, &options(), None)
            .await
            .unwrap();

        assert_eq!(outcome.audit_results.len(), 1);
        assert_eq!(outcome.failed_audits(), 0);
        assert!(outcome.aggregations.is_none());
    }

    #[tokio::test]
    async fn test_driver_omitting_artifact_is_collection_failure() {
        let plan = plan(&["is-on-https"], &[Pass::new(["https"])]);
        let err = PipelineRunner::new(&ForgetfulDriver, &WeightedAggregator)
            .execute(&plan, &options(), None)
            .await
            .unwrap_err();
        match err {
            PipelineError::Collection(CollectionError::MissingArtifact { gatherer }) => {
                assert_eq!(gatherer, "HTTPS")
            }
            other => panic!("expected missing artifact, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_rules_yield_empty_aggregations() {
        let driver = FixtureDriver::new(Artifacts::new());
        let plan = plan(&[], &[Pass::new(["https"])]);
        let outcome = PipelineRunner::new(&driver, &WeightedAggregator)
            .execute(&plan, &options(), Some(&[]))
            .await
            .unwrap();
        assert_eq!(outcome.aggregations, Some(AggregateReport::default()));
        assert!(driver.last_passes().is_empty());
    }
}
