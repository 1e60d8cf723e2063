//! Capability registry: gatherer descriptors, audits, and audit groups.
//!
//! Gatherers are keyed by the reference used in configuration (`"https"`)
//! and carry a declared name (`"HTTPS"`) that doubles as the name of the
//! artifact they produce. Audits are keyed by their own name. Groups map a
//! name to a fixed list of audit names.
//!
//! The builtin registry is built once per process and never mutated.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::audit::Audit;
use crate::audits;
use crate::error::{PipelineError, Result};
use crate::gatherers;

/// Descriptor of a gatherer capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GathererSpec {
    /// Declared name; also the key of the artifact it produces.
    pub name: String,
    pub description: String,
}

impl GathererSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A configured audit reference after classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuditRef {
    Audit(String),
    Group(String),
}

impl AuditRef {
    pub fn id(&self) -> &str {
        match self {
            AuditRef::Audit(id) | AuditRef::Group(id) => id,
        }
    }
}

impl fmt::Display for AuditRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditRef::Audit(id) => write!(f, "{id}"),
            AuditRef::Group(id) => write!(f, "group({id})"),
        }
    }
}

/// Registration failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate gatherer reference: {reference}")]
    DuplicateGathererReference { reference: String },

    #[error("gatherer name '{name}' is already produced by '{existing}'")]
    DuplicateGathererName { name: String, existing: String },

    #[error("duplicate audit registration: {name}")]
    DuplicateAudit { name: String },

    #[error("duplicate audit group: {name}")]
    DuplicateGroup { name: String },

    #[error("audit group '{group}' shadows an audit of the same name")]
    GroupShadowsAudit { group: String },

    #[error("audit group '{group}' references unknown audit '{audit}'")]
    UnknownGroupMember { group: String, audit: String },
}

/// Name-indexed capability lookup.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    gatherers: HashMap<String, GathererSpec>,
    /// declared name -> reference, to keep one producer per artifact
    gatherer_names: HashMap<String, String>,
    audits: BTreeMap<String, Arc<dyn Audit>>,
    groups: BTreeMap<String, Vec<String>>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("gatherers", &self.gatherers.keys().collect::<BTreeSet<_>>())
            .field("audits", &self.audits.keys().collect::<Vec<_>>())
            .field("groups", &self.groups)
            .finish()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide builtin catalog.
    pub fn builtin() -> &'static CapabilityRegistry {
        static BUILTIN: OnceLock<CapabilityRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            // The builtin tables are fixed; their consistency is covered by
            // `test_builtin_catalog_registers_cleanly`.
            let mut registry = CapabilityRegistry::new();
            for (reference, spec) in gatherers::builtin() {
                registry
                    .gatherer_names
                    .insert(spec.name.clone(), reference.to_string());
                registry.gatherers.insert(reference.to_string(), spec);
            }
            for audit in audits::builtin() {
                registry.audits.insert(audit.name().to_string(), audit);
            }
            for (group, members) in audits::builtin_groups() {
                registry.groups.insert(
                    group.to_string(),
                    members.iter().map(|m| m.to_string()).collect(),
                );
            }
            registry
        })
    }

    pub fn register_gatherer(
        &mut self,
        reference: impl Into<String>,
        spec: GathererSpec,
    ) -> std::result::Result<(), RegistryError> {
        let reference = reference.into();
        if self.gatherers.contains_key(&reference) {
            return Err(RegistryError::DuplicateGathererReference { reference });
        }
        if let Some(existing) = self.gatherer_names.get(&spec.name) {
            return Err(RegistryError::DuplicateGathererName {
                name: spec.name,
                existing: existing.clone(),
            });
        }
        self.gatherer_names
            .insert(spec.name.clone(), reference.clone());
        self.gatherers.insert(reference, spec);
        Ok(())
    }

    pub fn register_audit(&mut self, audit: Arc<dyn Audit>) -> std::result::Result<(), RegistryError> {
        let name = audit.name().to_string();
        if self.audits.contains_key(&name) {
            return Err(RegistryError::DuplicateAudit { name });
        }
        if self.groups.contains_key(&name) {
            return Err(RegistryError::GroupShadowsAudit { group: name });
        }
        self.audits.insert(name, audit);
        Ok(())
    }

    /// Register a group. Every member must already be a registered audit.
    pub fn register_group<I, S>(
        &mut self,
        group: impl Into<String>,
        members: I,
    ) -> std::result::Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = group.into();
        if self.groups.contains_key(&group) {
            return Err(RegistryError::DuplicateGroup { name: group });
        }
        if self.audits.contains_key(&group) {
            return Err(RegistryError::GroupShadowsAudit { group });
        }
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        if let Some(audit) = members.iter().find(|m| !self.audits.contains_key(*m)) {
            return Err(RegistryError::UnknownGroupMember {
                group,
                audit: audit.clone(),
            });
        }
        self.groups.insert(group, members);
        Ok(())
    }

    /// Resolve a configured gatherer reference. Unknown references are a
    /// hard failure naming the reference.
    pub fn resolve_gatherer(&self, reference: &str) -> Result<&GathererSpec> {
        self.gatherers
            .get(reference)
            .ok_or_else(|| PipelineError::UnknownGatherer {
                name: reference.to_string(),
            })
    }

    pub fn audit(&self, name: &str) -> Option<&Arc<dyn Audit>> {
        self.audits.get(name)
    }

    /// Classify a configured audit reference as an audit or a group.
    pub fn classify(&self, reference: &str) -> Result<AuditRef> {
        if self.audits.contains_key(reference) {
            Ok(AuditRef::Audit(reference.to_string()))
        } else if self.groups.contains_key(reference) {
            Ok(AuditRef::Group(reference.to_string()))
        } else {
            Err(PipelineError::UnknownAudit {
                name: reference.to_string(),
            })
        }
    }

    /// Flatten audit references into concrete audits.
    ///
    /// Order-preserving; each audit appears once, at its first occurrence.
    pub fn expand<S: AsRef<str>>(&self, references: &[S]) -> Result<Vec<Arc<dyn Audit>>> {
        Ok(self
            .expand_names(references)?
            .into_iter()
            .filter_map(|name| self.audits.get(&name).cloned())
            .collect())
    }

    /// [`expand`](Self::expand), then keep only whitelisted audits.
    ///
    /// Whitelist entries may name groups. Entries that resolve to nothing
    /// are logged and otherwise ignored.
    pub fn filter_and_expand<S: AsRef<str>>(
        &self,
        references: &[S],
        whitelist: Option<&BTreeSet<String>>,
    ) -> Result<Vec<Arc<dyn Audit>>> {
        let expanded = self.expand(references)?;
        let Some(whitelist) = whitelist else {
            return Ok(expanded);
        };

        let mut allowed = HashSet::new();
        for entry in whitelist {
            match self.classify(entry) {
                Ok(AuditRef::Audit(name)) => {
                    allowed.insert(name);
                }
                Ok(AuditRef::Group(group)) => {
                    allowed.extend(self.group_members(&group).iter().cloned());
                }
                Err(_) => warn!(audit = %entry, "whitelisted audit is not registered"),
            }
        }

        Ok(expanded
            .into_iter()
            .filter(|audit| allowed.contains(audit.name()))
            .collect())
    }

    fn expand_names<S: AsRef<str>>(&self, references: &[S]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for reference in references {
            let members = match self.classify(reference.as_ref())? {
                AuditRef::Audit(name) => vec![name],
                AuditRef::Group(group) => self.group_members(&group).to_vec(),
            };
            for name in members {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    fn group_members(&self, group: &str) -> &[String] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names of every registered audit, sorted.
    pub fn audit_names(&self) -> Vec<String> {
        self.audits.keys().cloned().collect()
    }

    /// Registered gatherer references, sorted, with their descriptors.
    pub fn gatherers(&self) -> Vec<(&str, &GathererSpec)> {
        let mut entries: Vec<_> = self
            .gatherers
            .iter()
            .map(|(reference, spec)| (reference.as_str(), spec))
            .collect();
        entries.sort_by_key(|(reference, _)| *reference);
        entries
    }

    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }
}
