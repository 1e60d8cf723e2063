//! Vantage: a dependency-driven audit pipeline.
//!
//! A [`Config`] names ordered collection passes and the audits to run.
//! The [`Orchestrator`] expands audit groups, works out which gatherers
//! the selected audits need, prunes every other gatherer (and any pass
//! left empty), then drives collection, auditing and optional aggregation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vantage_core::{Config, FixtureDriver, Flags, Orchestrator};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Arc::new(FixtureDriver::default());
//! let config = Config::builtin()?;
//! let report = Orchestrator::new(driver)
//!     .run("https://example.com", &Flags::default(), &config)
//!     .await?;
//! println!("{}", report.run_id);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod audit;
pub mod audits;
pub mod config;
pub mod driver;
pub mod error;
pub mod fakes;
pub mod gatherers;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod plan;
pub mod pruner;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod telemetry;

pub use aggregate::{
    AggregateReport, AggregationError, AggregationItem, AggregationRule, Aggregator,
    AuditExpectation, CategoryScore, Expected, ItemScore, SubScore, WeightedAggregator,
};
pub use audit::{Audit, AuditError, AuditMeta, AuditOutcome, AuditOutput, AuditResult, Score};
pub use config::{Config, ConfigLoadError, Flags, Pass, PassOptions, RunOptions};
pub use driver::{Artifacts, CollectionError, Driver};
pub use error::{PipelineError, Result};
pub use fakes::FixtureDriver;
pub use metrics::METRICS;
pub use orchestrator::Orchestrator;
pub use plan::RunPlan;
pub use pruner::{GathererBinding, PlannedPass};
pub use registry::{AuditRef, CapabilityRegistry, GathererSpec, RegistryError};
pub use report::{Report, ReportBody};
pub use runner::{PipelineRunner, RunOutcome};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Names of every builtin audit, sorted. Independent of any configuration.
pub fn audit_list() -> Vec<String> {
    CapabilityRegistry::builtin().audit_names()
}
