//! Run plan: the pruned passes and expanded audits for one run.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::audit::Audit;
use crate::pruner::PlannedPass;

/// Everything the runner needs, fixed before any collection starts.
#[derive(Clone)]
pub struct RunPlan {
    pub passes: Vec<PlannedPass>,
    pub audits: Vec<Arc<dyn Audit>>,
    pub required_gatherers: BTreeSet<String>,
    /// SHA-256 of the ordered scheduled gatherer names.
    pub digest: String,
}

impl RunPlan {
    pub fn new(
        passes: Vec<PlannedPass>,
        audits: Vec<Arc<dyn Audit>>,
        required_gatherers: BTreeSet<String>,
    ) -> Self {
        let digest = compute_plan_digest(&passes);
        Self {
            passes,
            audits,
            required_gatherers,
            digest,
        }
    }

    pub fn audit_names(&self) -> Vec<&str> {
        self.audits.iter().map(|a| a.name()).collect()
    }

    /// Gatherer names in execution order.
    pub fn scheduled_gatherers(&self) -> Vec<&str> {
        self.passes
            .iter()
            .flat_map(|pass| pass.gatherer_names())
            .collect()
    }
}

impl fmt::Debug for RunPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunPlan")
            .field("passes", &self.passes)
            .field("audits", &self.audit_names())
            .field("required_gatherers", &self.required_gatherers)
            .field("digest", &self.digest)
            .finish()
    }
}

/// Deterministic digest of the ordered pass layout.
fn compute_plan_digest(passes: &[PlannedPass]) -> String {
    let mut hasher = Sha256::new();
    for pass in passes {
        for name in pass.gatherer_names() {
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(b"\x1e");
    }
    hex::encode(hasher.finalize())
}
