//! Collection driver contract and the artifact set it produces.
//!
//! The driver owns the live session with the audited target. This crate
//! never looks inside it: it hands over the pruned passes and expects one
//! artifact per scheduled gatherer back, keyed by gatherer name.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::AuditError;
use crate::config::RunOptions;
use crate::pruner::PlannedPass;

/// Named values produced by gatherers during one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Artifacts(BTreeMap<String, Value>);

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an artifact, returning the previous value if the name was
    /// already taken.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Fetch an artifact an audit depends on.
    pub fn require(&self, name: &str) -> Result<&Value, AuditError> {
        self.0.get(name).ok_or_else(|| AuditError::MissingArtifact {
            artifact: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Artifacts {
    fn from_iter<T: IntoIterator<Item = (S, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Failures of the collection session. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("unable to reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("instrumentation failed: {0}")]
    Instrumentation(String),

    #[error("gatherer '{gatherer}' failed: {reason}")]
    Gatherer { gatherer: String, reason: String },

    #[error("driver returned no artifact for gatherer '{gatherer}'")]
    MissingArtifact { gatherer: String },
}

/// A live collection session.
///
/// Implementations run `passes` strictly in order and return the union of
/// the artifacts their gatherers produced. Pass-level options (page loads,
/// tracing, network capture) and the run-level `mobile`/`load_page` flags
/// are theirs to interpret.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn run(
        &self,
        passes: &[PlannedPass],
        options: &RunOptions,
    ) -> Result<Artifacts, CollectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_reports_missing_artifact() {
        let artifacts: Artifacts = [("HTTPS", json!({ "value": true }))].into_iter().collect();
        assert!(artifacts.require("HTTPS").is_ok());
        match artifacts.require("Viewport") {
            Err(AuditError::MissingArtifact { artifact }) => assert_eq!(artifact, "Viewport"),
            other => panic!("expected MissingArtifact, got {other:?}"),
        }
    }

    #[test]
    fn test_artifacts_serialize_as_plain_map() {
        let mut artifacts = Artifacts::new();
        artifacts.insert("ThemeColor", json!("#ff0000"));
        let value = serde_json::to_value(&artifacts).unwrap();
        assert_eq!(value, json!({ "ThemeColor": "#ff0000" }));
    }
}
