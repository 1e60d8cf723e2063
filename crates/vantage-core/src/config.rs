//! Pipeline configuration, caller flags, and resolved run options.
//!
//! A [`Config`] is the declarative input: ordered passes, audit references
//! and optional aggregation rules. [`Flags`] are caller overrides; they are
//! merged with defaults into a fresh [`RunOptions`] and never mutated.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::AggregationRule;
use crate::error::{PipelineError, Result};

/// Emulate a mobile viewport and network profile unless told otherwise.
pub const DEFAULT_MOBILE: bool = true;

/// Perform a fresh navigation before the first pass unless told otherwise.
pub const DEFAULT_LOAD_PAGE: bool = true;

const BUILTIN_CONFIG: &str = include_str!("../configs/default.json");

fn is_false(value: &bool) -> bool {
    !*value
}

/// Pass-level options. Anything beyond the known keys is carried verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassOptions {
    /// Navigate to the target before this pass runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_page: Option<bool>,

    /// Record network activity during the pass.
    #[serde(default, skip_serializing_if = "is_false")]
    pub network: bool,

    /// Record a performance trace during the pass.
    #[serde(default, skip_serializing_if = "is_false")]
    pub trace: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One ordered collection phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pass {
    /// Gatherer references, resolved through the capability registry.
    #[serde(default)]
    pub gatherers: Vec<String>,

    #[serde(flatten)]
    pub options: PassOptions,
}

impl Pass {
    pub fn new<I, S>(gatherers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gatherers: gatherers.into_iter().map(Into::into).collect(),
            options: PassOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PassOptions) -> Self {
        self.options = options;
        self
    }
}

/// Declarative pipeline configuration.
///
/// `passes` and `audits` are optional at the type level so that an absent
/// field can be told apart from an empty one; [`Config::validate`] rejects
/// the former.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passes: Option<Vec<Pass>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audits: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<AggregationRule>>,
}

/// A configuration whose required fields are known to be present.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedConfig<'a> {
    pub passes: &'a [Pass],
    pub audits: &'a [String],
    pub aggregations: Option<&'a [AggregationRule]>,
}

impl Config {
    pub fn new(passes: Vec<Pass>, audits: Vec<String>) -> Self {
        Self {
            passes: Some(passes),
            audits: Some(audits),
            aggregations: None,
        }
    }

    pub fn with_aggregations(mut self, aggregations: Vec<AggregationRule>) -> Self {
        self.aggregations = Some(aggregations);
        self
    }

    /// Check that `passes` and `audits` are both present.
    ///
    /// Emptiness is not checked; deeper problems surface as registry lookup
    /// failures later in the build.
    pub fn validate(&self) -> Result<ValidatedConfig<'_>> {
        match (&self.passes, &self.audits) {
            (Some(passes), Some(audits)) => Ok(ValidatedConfig {
                passes,
                audits,
                aggregations: self.aggregations.as_deref(),
            }),
            (passes, audits) => {
                let mut missing = Vec::new();
                if passes.is_none() {
                    missing.push("passes");
                }
                if audits.is_none() {
                    missing.push("audits");
                }
                Err(PipelineError::ConfigInvalid { missing })
            }
        }
    }

    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigLoadError> {
        serde_json::from_str(json).map_err(|source| ConfigLoadError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Load a single-file configuration.
    pub fn from_path(path: &Path) -> std::result::Result<Self, ConfigLoadError> {
        let text = read(path)?;
        serde_json::from_str(&text).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a split configuration: `passes.json`, `audits.json` and an
    /// optional `aggregations.json` under `dir`.
    ///
    /// A missing part leaves the matching field absent, so a directory
    /// without `passes.json` still fails validation as `ConfigInvalid`.
    pub fn from_dir(dir: &Path) -> std::result::Result<Self, ConfigLoadError> {
        Ok(Self {
            passes: read_part(&dir.join("passes.json"))?,
            audits: read_part(&dir.join("audits.json"))?,
            aggregations: read_part(&dir.join("aggregations.json"))?,
        })
    }

    /// The bundled default configuration, covering every builtin capability.
    pub fn builtin() -> std::result::Result<Self, ConfigLoadError> {
        serde_json::from_str(BUILTIN_CONFIG).map_err(|source| ConfigLoadError::Parse {
            path: PathBuf::from("configs/default.json"),
            source,
        })
    }
}

fn read(path: &Path) -> std::result::Result<String, ConfigLoadError> {
    std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_part<T>(path: &Path) -> std::result::Result<Option<T>, ConfigLoadError>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }
    let text = read(path)?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Errors reading or parsing configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Caller-supplied overrides. Unset fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Flags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_page: Option<bool>,

    /// Restrict the expanded audit set to these references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_whitelist: Option<BTreeSet<String>>,
}

impl Flags {
    pub fn with_mobile(mut self, mobile: bool) -> Self {
        self.mobile = Some(mobile);
        self
    }

    pub fn with_load_page(mut self, load_page: bool) -> Self {
        self.load_page = Some(load_page);
        self
    }

    pub fn with_audit_whitelist<I, S>(mut self, audits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audit_whitelist = Some(audits.into_iter().map(Into::into).collect());
        self
    }
}

/// Fully-resolved options for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    pub url: String,
    pub mobile: bool,
    pub load_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_whitelist: Option<BTreeSet<String>>,
}

impl RunOptions {
    /// Merge `flags` over the defaults into a new options value.
    pub fn resolve(url: impl Into<String>, flags: &Flags) -> Self {
        Self {
            url: url.into(),
            mobile: flags.mobile.unwrap_or(DEFAULT_MOBILE),
            load_page: flags.load_page.unwrap_or(DEFAULT_LOAD_PAGE),
            audit_whitelist: flags.audit_whitelist.clone(),
        }
    }
}
