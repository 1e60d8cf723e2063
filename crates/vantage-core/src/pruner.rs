//! Pass pruning.
//!
//! Two stages per gatherer reference: resolve-or-fail, then
//! require-or-drop. A pass left with no gatherers is removed entirely.
//! Surviving passes keep their relative order and every non-gatherer
//! option.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::config::Pass;
use crate::error::{PipelineError, Result};
use crate::registry::CapabilityRegistry;

/// A gatherer reference together with the name it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GathererBinding {
    pub reference: String,
    pub name: String,
}

/// A pass that survived pruning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPass {
    /// Position of the pass in the original configuration.
    pub index: usize,
    /// The pruned pass: original options, only required gatherer references.
    pub pass: Pass,
    pub gatherers: Vec<GathererBinding>,
}

impl PlannedPass {
    pub fn gatherer_names(&self) -> impl Iterator<Item = &str> {
        self.gatherers.iter().map(|g| g.name.as_str())
    }
}

/// Prune `passes` down to the gatherers named in `required`.
///
/// Every reference is resolved, including those in passes that end up
/// dropped: an unknown reference fails the whole build. Two surviving
/// references resolving to the same name would produce one artifact twice
/// and fail as [`PipelineError::DuplicateGatherer`].
pub fn prune(
    passes: &[Pass],
    required: &BTreeSet<String>,
    registry: &CapabilityRegistry,
) -> Result<Vec<PlannedPass>> {
    let mut planned = Vec::new();
    let mut scheduled: HashMap<String, usize> = HashMap::new();

    for (index, pass) in passes.iter().enumerate() {
        let mut kept = Vec::new();
        for reference in &pass.gatherers {
            let spec = registry.resolve_gatherer(reference)?;
            if required.contains(&spec.name) {
                kept.push(GathererBinding {
                    reference: reference.clone(),
                    name: spec.name.clone(),
                });
            }
        }

        if kept.is_empty() {
            continue;
        }

        for binding in &kept {
            if let Some(&first_pass) = scheduled.get(&binding.name) {
                return Err(PipelineError::DuplicateGatherer {
                    name: binding.name.clone(),
                    first_pass,
                    second_pass: index,
                });
            }
            scheduled.insert(binding.name.clone(), index);
        }

        planned.push(PlannedPass {
            index,
            pass: Pass {
                gatherers: kept.iter().map(|b| b.reference.clone()).collect(),
                options: pass.options.clone(),
            },
            gatherers: kept,
        });
    }

    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PassOptions;
    use crate::registry::GathererSpec;
    use serde_json::json;

    fn registry() -> CapabilityRegistry {
        let mut reg = CapabilityRegistry::new();
        for (reference, name) in [("a", "A"), ("b", "B"), ("c", "C"), ("d", "D")] {
            reg.register_gatherer(reference, GathererSpec::new(name, reference))
                .unwrap();
        }
        reg
    }

    fn required(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn pruned_passes(planned: &[PlannedPass]) -> Vec<Pass> {
        planned.iter().map(|p| p.pass.clone()).collect()
    }

    #[test]
    fn test_drops_pass_left_empty() {
        let passes = vec![Pass::new(["a", "b"]), Pass::new(["c"])];
        let planned = prune(&passes, &required(&["B"]), &registry()).unwrap();

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].index, 0);
        assert_eq!(planned[0].pass.gatherers, vec!["b"]);
        assert_eq!(planned[0].gatherer_names().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_preserves_order_and_options() {
        let options = PassOptions {
            load_page: Some(false),
            trace: true,
            ..Default::default()
        };
        let mut extra = PassOptions::default();
        extra.extra.insert("disableJavaScript".to_string(), json!(true));

        let passes = vec![
            Pass::new(["a"]).with_options(options.clone()),
            Pass::new(["d"]),
            Pass::new(["c", "b"]).with_options(extra.clone()),
        ];
        let planned = prune(&passes, &required(&["A", "B", "C"]), &registry()).unwrap();

        let indices: Vec<usize> = planned.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(planned[0].pass.options, options);
        assert_eq!(planned[1].pass.options, extra);
        assert_eq!(planned[1].pass.gatherers, vec!["c", "b"]);
    }

    #[test]
    fn test_unknown_reference_fails_even_in_dropped_pass() {
        let passes = vec![Pass::new(["a"]), Pass::new(["missingGatherer"])];
        match prune(&passes, &required(&["A"]), &registry()) {
            Err(PipelineError::UnknownGatherer { name }) => assert_eq!(name, "missingGatherer"),
            other => panic!("expected UnknownGatherer, got {other:?}"),
        }
    }

    #[test]
    fn test_pruning_is_idempotent() {
        let passes = vec![
            Pass::new(["a", "b"]),
            Pass::new(["c"]),
            Pass::new(["b", "d"]),
        ];
        let req = required(&["A", "D"]);
        let once = prune(&passes, &req, &registry()).unwrap();
        let twice = prune(&pruned_passes(&once), &req, &registry()).unwrap();
        assert_eq!(pruned_passes(&once), pruned_passes(&twice));
    }

    #[test]
    fn test_duplicate_producer_rejected() {
        let passes = vec![Pass::new(["a"]), Pass::new(["a", "b"])];
        match prune(&passes, &required(&["A", "B"]), &registry()) {
            Err(PipelineError::DuplicateGatherer {
                name,
                first_pass,
                second_pass,
            }) => {
                assert_eq!(name, "A");
                assert_eq!((first_pass, second_pass), (0, 1));
            }
            other => panic!("expected DuplicateGatherer, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_that_is_not_required_is_ignored() {
        let passes = vec![Pass::new(["a", "b"]), Pass::new(["a"])];
        let planned = prune(&passes, &required(&["B"]), &registry()).unwrap();
        assert_eq!(planned.len(), 1);
    }

    #[test]
    fn test_nothing_required_prunes_everything() {
        let passes = vec![Pass::new(["a"]), Pass::new(["b"])];
        let planned = prune(&passes, &BTreeSet::new(), &registry()).unwrap();
        assert!(planned.is_empty());
    }
}
