//! Structured lifecycle events for pipeline runs.
//!
//! Every event carries an `event` field so log pipelines can filter on it.
//! Run-level events are emitted inside the span returned by [`run_span`],
//! which tags them with `run_id` and `url`.

use std::fmt::Display;

use tracing::{info, warn, Span};

/// Span covering one run. Attach it with `tracing::Instrument`.
pub fn run_span(run_id: &str, url: &str) -> Span {
    tracing::info_span!("vantage.run", run_id = %run_id, url = %url)
}

pub fn emit_run_started(run_id: &str, url: &str) {
    info!(event = "run.started", run_id = %run_id, url = %url);
}

/// Emit event: plan fixed, before any collection.
pub fn emit_plan_built(passes: usize, gatherers: usize, audits: usize, digest: &str) {
    info!(
        event = "plan.built",
        passes = passes,
        gatherers = gatherers,
        audits = audits,
        digest = %digest,
    );
}

/// Emit event: a configured pass had no required gatherers left.
pub fn emit_pass_dropped(index: usize) {
    info!(event = "pass.dropped", pass_index = index);
}

pub fn emit_collection_finished(artifacts: usize, duration_ms: u64) {
    info!(
        event = "collection.finished",
        artifacts = artifacts,
        duration_ms = duration_ms,
    );
}

/// Emit event: one audit failed (warning level). The run continues.
pub fn emit_audit_failed(audit: &str, error: &dyn Display) {
    warn!(event = "audit.failed", audit = %audit, error = %error);
}

pub fn emit_aggregation_finished(categories: usize) {
    info!(event = "aggregation.finished", categories = categories);
}

/// Emit event: run finished with duration and failed-audit count.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, audits: usize, failed_audits: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        audits = audits,
        failed_audits = failed_audits,
    );
}

/// Emit event: run aborted (warning level).
pub fn emit_run_failed(run_id: &str, error: &dyn Display) {
    warn!(event = "run.failed", run_id = %run_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("run-1", "https://example.com");
        let _guard = span.enter();
        emit_run_started("run-1", "https://example.com");
        emit_audit_failed("viewport", &"missing artifact");
    }
}
