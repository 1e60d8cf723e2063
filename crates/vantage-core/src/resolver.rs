//! Required-gatherer resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::audit::Audit;

/// Union of every audit's declared required artifacts.
///
/// This is the single answer to "what must be collected". Declarations are
/// trusted as-is.
pub fn required_gatherers(audits: &[Arc<dyn Audit>]) -> BTreeSet<String> {
    audits
        .iter()
        .flat_map(|audit| audit.required_artifacts().iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CapabilityRegistry;

    #[test]
    fn test_union_without_multiplicity() {
        let registry = CapabilityRegistry::builtin();
        let audits = registry
            .expand(&["is-on-https", "redirects-http", "pwa"])
            .unwrap();
        let required = required_gatherers(&audits);
        assert!(required.contains("HTTPS"));
        assert!(required.contains("HTTPRedirect"));
        assert!(required.contains("Viewport"));
        assert!(!required.contains("Timings"));
        assert_eq!(required.len(), 6);
    }

    #[test]
    fn test_no_audits_require_nothing() {
        assert!(required_gatherers(&[]).is_empty());
    }
}
