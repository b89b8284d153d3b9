//! sched-migrate — copy scheduler state from the coordination tree to the
//! API server.
//!
//! # Usage
//!
//! ```text
//! sched-migrate --legacy /data/tree-a.redb,/data/tree-b.redb --target /data/api.redb
//! sched-migrate --config migrate.toml --log-json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sched_migrate::{MigrateConfig, MigrationReport};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "sched-migrate", about = "Migrate scheduler state to the API server")]
struct Cli {
    /// Comma-separated coordination tree addresses.
    #[arg(long)]
    legacy: Option<String>,

    /// Root path of scheduler data inside the tree.
    #[arg(long)]
    legacy_root: Option<String>,

    /// API server store to migrate into.
    #[arg(long)]
    target: Option<PathBuf>,

    /// TOML config file; command-line values take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sched_store=debug,sched_migrate=debug"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn run(cli: Cli) -> anyhow::Result<MigrationReport> {
    let mut config = match &cli.config {
        Some(path) => MigrateConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MigrateConfig::default(),
    };
    config.apply_overrides(
        cli.legacy.as_deref(),
        cli.legacy_root.as_deref(),
        cli.target.as_deref(),
    );
    let report = sched_migrate::migrate(&config).context("migration aborted")?;
    Ok(report)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli) {
        Ok(report) => {
            info!(
                total = report.total(),
                applications = report.applications,
                task_groups = report.task_groups,
                tasks = report.tasks,
                secrets = report.secrets,
                renamed_secrets = report.renamed_secrets,
                missing_endpoints = report.missing_endpoints,
                custom_resource_definitions = report.custom_resource_definitions,
                "migration complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "migration failed");
            ExitCode::from(1)
        }
    }
}
