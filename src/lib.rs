// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod host;
pub mod logging;
pub mod notify;
pub mod retry;
pub mod store;
pub mod types;
pub mod vcs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{AdminArgs, AdminCommand, CliArgs, LogLevel};
use crate::config::{resolve, ConfigSources, LabConfig};
use crate::engine::{RunRequest, Supervisor};
use crate::errors::LabpilotError;
use crate::exec::ProcessExecutor;
use crate::notify::{build_sink, Notifier};
use crate::store::{RecordFilter, RecordStore, SqliteStore};
use crate::vcs::{AiCommitMessenger, GitCli, SnapshotPolicy, Snapshotter};

/// High-level entry point used by `labrun`.
///
/// This wires together:
/// - config resolution and logging
/// - record store
/// - git snapshotter (with optional AI commit messages)
/// - notification sinks
/// - process executor
///
/// Returns the exit code the process should terminate with; it mirrors the
/// child's. Errors are the fatal cases: config, policy violation, or the
/// store being unusable before launch.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_config(args.config.clone(), args.log_level)?;
    let timeout = cfg.effective_timeout(args.timeout);

    let store = SqliteStore::open(&cfg.database.path)?;
    let client = http_client()?;

    let workdir = std::env::current_dir().context("reading current directory")?;
    let ai = AiCommitMessenger::from_config(client.clone(), &cfg.ai);
    let snapshotter =
        Snapshotter::new(GitCli::new(&workdir), SnapshotPolicy::from(&cfg.git)).with_ai(ai);
    let notifier = Notifier::new(build_sink(&cfg, &client));
    let executor = ProcessExecutor::new();

    let request = RunRequest {
        argv: args.command,
        timeout,
        commit_message: args.message,
        server: host::resolve_server_name(cfg.server_name.as_deref()),
        max_log_lines: cfg.logging.max_log_lines,
        workdir,
        echo: true,
    };

    let supervisor = Supervisor::new(&store, &snapshotter, &notifier, &executor);
    let report = supervisor.run(&request).await?;

    info!(
        record_id = report.record_id,
        status = %report.status(),
        exit_code = report.exit_code(),
        "experiment recorded"
    );
    Ok(report.exit_code())
}

/// Entry point used by `labpilot`. Prints JSON to stdout.
pub async fn admin(args: AdminArgs) -> Result<()> {
    let cfg = load_config(args.config.clone(), args.log_level)?;

    match args.command {
        AdminCommand::List(list) => {
            let store = SqliteStore::open(&cfg.database.path)?;
            let filter = RecordFilter {
                status: list.status,
                server: list.server,
                search: list.search,
                skip: list.skip,
                limit: usize::try_from(list.limit).ok(),
            };
            print_json(&store.list(&filter)?)
        }
        AdminCommand::Show { id } => {
            let store = SqliteStore::open(&cfg.database.path)?;
            let record = store.get(id)?.ok_or(LabpilotError::RecordNotFound(id))?;
            print_json(&record)
        }
        AdminCommand::Stats => {
            let store = SqliteStore::open(&cfg.database.path)?;
            print_json(&store.stats()?)
        }
        AdminCommand::Delete { id } => {
            let store = SqliteStore::open(&cfg.database.path)?;
            store.delete(id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        AdminCommand::NotifyTest => {
            let notifier = Notifier::new(build_sink(&cfg, &http_client()?));
            let delivered = notifier.test().await;
            print_json(&serde_json::json!({
                "sink": notifier.sink_name(),
                "delivered": delivered,
            }))
        }
    }
}

/// Resolve the config, then install logging with its `logging.level`.
fn load_config(explicit: Option<PathBuf>, cli_level: Option<LogLevel>) -> Result<LabConfig> {
    let (cfg, source) = resolve(&ConfigSources::discover(explicit))?;
    logging::init_logging(cli_level, cfg.logging.level)?;
    match source {
        Some(path) => debug!(path = %path.display(), "configuration loaded"),
        None => debug!("no configuration file; using defaults"),
    }
    Ok(cfg)
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("labpilot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
