//! Audit capability contract and per-audit result handling.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::Artifacts;
use crate::metrics::METRICS;
use crate::obs;

/// Static description of an audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditMeta {
    /// Unique identifier, as referenced from configuration.
    pub name: String,
    pub category: String,
    pub description: String,
    /// Gatherer names whose artifacts this audit reads.
    pub required_artifacts: Vec<String>,
}

impl AuditMeta {
    pub fn new<I, S>(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        required_artifacts: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
            required_artifacts: required_artifacts.into_iter().map(Into::into).collect(),
        }
    }
}

/// An analysis routine over collected artifacts.
///
/// `required_artifacts` is trusted completely: it decides which gatherers
/// run, and nothing checks that `audit` stays within it.
pub trait Audit: Send + Sync {
    fn meta(&self) -> &AuditMeta;

    fn audit(&self, artifacts: &Artifacts) -> Result<AuditOutput, AuditError>;

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn required_artifacts(&self) -> &[String] {
        &self.meta().required_artifacts
    }
}

/// Raw score of a successful audit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Binary(bool),
    /// Expected in `[0, 1]`.
    Numeric(f64),
}

/// Output of a successful audit computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOutput {
    pub score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AuditOutput {
    pub fn binary(passed: bool) -> Self {
        Self {
            score: Score::Binary(passed),
            display_value: None,
            details: None,
        }
    }

    pub fn numeric(score: f64) -> Self {
        Self {
            score: Score::Numeric(score),
            display_value: None,
            details: None,
        }
    }

    pub fn with_display_value(mut self, display_value: impl Into<String>) -> Self {
        self.display_value = Some(display_value.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Why an audit computation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    #[error("required artifact '{artifact}' is missing")]
    MissingArtifact { artifact: String },

    #[error("artifact '{artifact}' is malformed: {reason}")]
    MalformedArtifact { artifact: String, reason: String },

    #[error("{0}")]
    Computation(String),
}

impl AuditError {
    pub fn malformed(artifact: &str, reason: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }
}

/// Success value or failure marker for one audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    Completed(AuditOutput),
    Failed { error: String },
}

/// One entry of a run's audit results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(flatten)]
    pub outcome: AuditOutcome,
}

impl AuditResult {
    pub fn completed(meta: &AuditMeta, output: AuditOutput) -> Self {
        Self::with_outcome(meta, AuditOutcome::Completed(output))
    }

    pub fn failed(meta: &AuditMeta, error: &AuditError) -> Self {
        Self::with_outcome(
            meta,
            AuditOutcome::Failed {
                error: error.to_string(),
            },
        )
    }

    fn with_outcome(meta: &AuditMeta, outcome: AuditOutcome) -> Self {
        Self {
            name: meta.name.clone(),
            category: meta.category.clone(),
            description: meta.description.clone(),
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AuditOutcome::Failed { .. })
    }

    pub fn score(&self) -> Option<Score> {
        match &self.outcome {
            AuditOutcome::Completed(output) => Some(output.score),
            AuditOutcome::Failed { .. } => None,
        }
    }
}

/// Run every audit against the full artifact set.
///
/// One result per audit, in input order. A failing audit is recorded as
/// its own failure result; the loop always completes.
pub fn run_audits(audits: &[Arc<dyn Audit>], artifacts: &Artifacts) -> Vec<AuditResult> {
    audits
        .iter()
        .map(|audit| {
            let meta = audit.meta();
            let outcome = meta
                .required_artifacts
                .iter()
                .try_for_each(|name| artifacts.require(name).map(|_| ()))
                .and_then(|()| audit.audit(artifacts));

            match outcome {
                Ok(output) => AuditResult::completed(meta, output),
                Err(err) => {
                    METRICS.inc_audits_failed();
                    obs::emit_audit_failed(&meta.name, &err);
                    AuditResult::failed(meta, &err)
                }
            }
        })
        .collect()
}
