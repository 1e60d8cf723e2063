//! Fixture-backed driver.
//!
//! Serves artifacts from a prepared map instead of a live session. Used by
//! the CLI's offline mode and by tests that need to observe what the
//! pipeline asked for.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::config::{ConfigLoadError, RunOptions};
use crate::driver::{Artifacts, CollectionError, Driver};
use crate::pruner::PlannedPass;

/// Driver that answers every scheduled gatherer from a fixture map.
///
/// Only the artifacts of scheduled gatherers are returned. A scheduled
/// gatherer missing from the fixture is reported as
/// [`CollectionError::Gatherer`].
#[derive(Debug, Default)]
pub struct FixtureDriver {
    fixture: Artifacts,
    failure: Option<CollectionError>,
    calls: AtomicUsize,
    last_passes: Mutex<Vec<PlannedPass>>,
    last_options: Mutex<Option<RunOptions>>,
}

impl FixtureDriver {
    pub fn new(fixture: Artifacts) -> Self {
        Self {
            fixture,
            ..Self::default()
        }
    }

    /// Driver whose every session fails with `error`.
    pub fn failing(error: CollectionError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Load a fixture from a JSON object of `{ "<gatherer name>": value }`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fixture = serde_json::from_str(&text).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(fixture))
    }

    /// Number of sessions started so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Passes handed over by the most recent session.
    pub fn last_passes(&self) -> Vec<PlannedPass> {
        self.last_passes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_options(&self) -> Option<RunOptions> {
        self.last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Driver for FixtureDriver {
    async fn run(
        &self,
        passes: &[PlannedPass],
        options: &RunOptions,
    ) -> Result<Artifacts, CollectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_passes
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = passes.to_vec();
        *self
            .last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(options.clone());

        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let mut artifacts = Artifacts::new();
        for name in passes.iter().flat_map(|pass| pass.gatherer_names()) {
            let value = self
                .fixture
                .get(name)
                .cloned()
                .ok_or_else(|| CollectionError::Gatherer {
                    gatherer: name.to_string(),
                    reason: "no fixture value".to_string(),
                })?;
            artifacts.insert(name, value);
        }
        Ok(artifacts)
    }
}
