// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Two binaries share this module: `labrun` ([`CliArgs`]) wraps a command,
//! `labpilot` ([`AdminArgs`]) queries the stored records.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::types::RunStatus;

/// Command-line arguments for `labrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "labrun",
    version,
    about = "Run an experiment command and record it with LabPilot.",
    long_about = None
)]
pub struct CliArgs {
    /// Wall-clock limit in seconds; 0 or a negative value disables it.
    ///
    /// Default: `timeout.default` from the config (86400).
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    /// Use this config file instead of the standard lookup.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Commit message for the auto-snapshot of a dirty tree.
    #[arg(short = 'm', long, value_name = "TEXT")]
    pub message: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LABPILOT_LOG`, then `logging.level` from the config,
    /// then `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to run, passed through verbatim.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// Command-line arguments for `labpilot`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "labpilot",
    version,
    about = "Inspect experiment runs recorded by labrun.",
    long_about = None
)]
pub struct AdminArgs {
    /// Use this config file instead of the standard lookup.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AdminCommand {
    /// List runs, newest first.
    List(ListArgs),
    /// Show one run.
    Show {
        id: i64,
    },
    /// Counts by status and server.
    Stats,
    /// Delete one run.
    Delete {
        id: i64,
    },
    /// Send a test notification through the configured sinks.
    NotifyTest,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[arg(long, value_parser = parse_status)]
    pub status: Option<RunStatus>,

    #[arg(long)]
    pub server: Option<String>,

    /// Substring of the command, log snippet or checkpoint path.
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// 1 to 1000.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub limit: u64,
}

fn parse_status(s: &str) -> Result<RunStatus, String> {
    s.parse()
}

/// Log level, from `--log-level` or `logging.level`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Convenience wrapper around `AdminArgs::parse()`.
pub fn parse_admin() -> AdminArgs {
    AdminArgs::parse()
}
