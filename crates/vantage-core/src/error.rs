//! Pipeline-level error taxonomy.
//!
//! Build-time errors (`ConfigInvalid`, `UnknownGatherer`, `UnknownAudit`,
//! `DuplicateGatherer`) are raised before the driver is touched. Collection
//! and aggregation errors are fatal to the run. Individual audit failures
//! never show up here; they are recorded on the audit's own result.

use crate::aggregate::AggregationError;
use crate::driver::CollectionError;

/// Errors that fail a pipeline build or run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(
        "config is invalid: missing {}. Did you define passes and audits?",
        .missing.join(" and ")
    )]
    ConfigInvalid { missing: Vec<&'static str> },

    #[error("unable to locate gatherer: {name}")]
    UnknownGatherer { name: String },

    #[error("unable to locate audit: {name}")]
    UnknownAudit { name: String },

    #[error("gatherer '{name}' is scheduled more than once (passes {first_pass} and {second_pass})")]
    DuplicateGatherer {
        name: String,
        first_pass: usize,
        second_pass: usize,
    },

    #[error("collection failed: {0}")]
    Collection(#[from] CollectionError),

    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
}

impl PipelineError {
    /// True for errors raised while building the plan, before any collection.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            PipelineError::ConfigInvalid { .. }
                | PipelineError::UnknownGatherer { .. }
                | PipelineError::UnknownAudit { .. }
                | PipelineError::DuplicateGatherer { .. }
        )
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_invalid_lists_missing_fields() {
        let err = PipelineError::ConfigInvalid {
            missing: vec!["passes", "audits"],
        };
        let msg = err.to_string();
        assert!(msg.contains("config is invalid"));
        assert!(msg.contains("passes and audits"));
    }

    #[test]
    fn test_unknown_gatherer_names_the_gatherer() {
        let err = PipelineError::UnknownGatherer {
            name: "missingGatherer".to_string(),
        };
        assert!(err.to_string().contains("missingGatherer"));
        assert!(err.is_build_error());
    }

    #[test]
    fn test_collection_error_is_not_build_error() {
        let err = PipelineError::from(CollectionError::Instrumentation(
            "tracing domain unavailable".to_string(),
        ));
        assert!(!err.is_build_error());
        assert!(err.to_string().contains("tracing domain unavailable"));
    }
}
