//! Vantage CLI
//!
//! The `vantage` command plans and runs audit pipelines.
//!
//! ## Commands
//!
//! - `list-audits`: Print every builtin audit
//! - `plan`: Show the pruned passes and audits a config would run
//! - `run`: Run a config against one or more URLs using recorded artifacts

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use vantage_core::{
    audit_list, CapabilityRegistry, Config, FixtureDriver, Flags, Orchestrator, PlannedPass,
    Report, METRICS,
};

#[derive(Parser)]
#[command(name = "vantage")]
#[command(version = vantage_core::VERSION)]
#[command(about = "Dependency-driven audit pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct ConfigArgs {
    /// Single-file JSON config (default: bundled config)
    #[arg(short, long, conflicts_with = "config_dir")]
    config: Option<PathBuf>,

    /// Directory holding passes.json, audits.json and optional aggregations.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Only run these audits or groups (repeatable)
    #[arg(short, long = "audit", value_name = "AUDIT")]
    audits: Vec<String>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Config> {
        match (&self.config, &self.config_dir) {
            (Some(path), _) => Config::from_path(path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            (None, Some(dir)) => Config::from_dir(dir)
                .with_context(|| format!("Failed to load config from {}", dir.display())),
            (None, None) => Config::builtin().context("Failed to load bundled config"),
        }
    }

    fn flags(&self) -> Flags {
        if self.audits.is_empty() {
            Flags::default()
        } else {
            Flags::default().with_audit_whitelist(self.audits.iter().cloned())
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List every builtin audit
    ListAudits {
        /// Also list gatherers and audit groups
        #[arg(long)]
        all: bool,
    },

    /// Show what a config would collect and audit, without running it
    Plan {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Run the pipeline against recorded artifacts
    Run {
        /// Target URL (repeatable; runs execute concurrently)
        #[arg(short, long = "url", value_name = "URL", required = true)]
        urls: Vec<String>,

        /// JSON file mapping gatherer names to recorded artifacts
        #[arg(long)]
        artifacts: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Disable mobile emulation
        #[arg(long)]
        no_mobile: bool,

        /// Do not navigate before the first pass
        #[arg(long)]
        no_load_page: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    vantage_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::ListAudits { all } => cmd_list_audits(all),
        Commands::Plan { config } => cmd_plan(&config),
        Commands::Run {
            urls,
            artifacts,
            config,
            no_mobile,
            no_load_page,
            output,
        } => {
            let mut flags = config.flags();
            if no_mobile {
                flags = flags.with_mobile(false);
            }
            if no_load_page {
                flags = flags.with_load_page(false);
            }
            let result = cmd_run(&urls, &artifacts, &config, &flags, output.as_deref()).await;
            METRICS.flush();
            result
        }
    }
}

fn cmd_list_audits(all: bool) -> Result<()> {
    for name in audit_list() {
        println!("{name}");
    }
    if !all {
        return Ok(());
    }

    let registry = CapabilityRegistry::builtin();
    println!();
    println!("Gatherers:");
    for (reference, spec) in registry.gatherers() {
        println!("  {:<26} {:<22} {}", reference, spec.name, spec.description);
    }
    println!();
    println!("Groups:");
    for (group, members) in registry.groups() {
        println!("  {:<26} {}", group, members.join(", "));
    }
    Ok(())
}

/// Plan preview printed by `vantage plan`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanSummary<'a> {
    digest: &'a str,
    audits: Vec<&'a str>,
    required_gatherers: &'a BTreeSet<String>,
    passes: &'a [PlannedPass],
}

fn plan_summary(config: &ConfigArgs) -> Result<String> {
    let loaded = config.load()?;
    let orchestrator = Orchestrator::new(Arc::new(FixtureDriver::default()));
    let plan = orchestrator
        .plan(&loaded, &config.flags())
        .context("Failed to build plan")?;

    let summary = PlanSummary {
        digest: &plan.digest,
        audits: plan.audit_names(),
        required_gatherers: &plan.required_gatherers,
        passes: &plan.passes,
    };
    serde_json::to_string_pretty(&summary).context("Failed to serialize plan")
}

fn cmd_plan(config: &ConfigArgs) -> Result<()> {
    println!("{}", plan_summary(config)?);
    Ok(())
}

async fn run_reports(
    urls: &[String],
    artifacts: &Path,
    config: &ConfigArgs,
    flags: &Flags,
) -> Result<Vec<Report>> {
    let loaded = config.load()?;
    let driver = FixtureDriver::from_path(artifacts)
        .with_context(|| format!("Failed to load artifacts {}", artifacts.display()))?;
    let orchestrator = Orchestrator::new(Arc::new(driver));

    info!(urls = urls.len(), "Starting runs");
    futures::future::try_join_all(urls.iter().map(|url| {
        let orchestrator = &orchestrator;
        let loaded = &loaded;
        async move {
            orchestrator
                .run(url, flags, loaded)
                .await
                .with_context(|| format!("Run failed for {url}"))
        }
    }))
    .await
}

async fn cmd_run(
    urls: &[String],
    artifacts: &Path,
    config: &ConfigArgs,
    flags: &Flags,
    output: Option<&Path>,
) -> Result<()> {
    if urls.is_empty() {
        bail!("at least one --url is required");
    }

    let reports = run_reports(urls, artifacts, config, flags).await?;
    let rendered = match reports.as_slice() {
        [single] => serde_json::to_string_pretty(single),
        many => serde_json::to_string_pretty(many),
    }
    .context("Failed to serialize report")?;

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
