// src/logging.rs

//! Diagnostics for labpilot.
//!
//! The level is the first one found in:
//! 1. `--log-level`
//! 2. the `LABPILOT_LOG` environment variable
//! 3. `logging.level` in the resolved config file
//! 4. `info`
//!
//! That level applies to labpilot's own events. Dependencies (reqwest,
//! hyper, rusqlite) are capped at `warn`. Everything goes to stderr; stdout
//! belongs to the supervised command.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "LABPILOT_LOG";

/// Install the global subscriber. Call once, after the config is loaded.
pub fn init_logging(cli_level: Option<LogLevel>, config_level: Option<LogLevel>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR).ok();
    let level = resolve_level(cli_level, env_level.as_deref(), config_level);

    fmt()
        .with_env_filter(EnvFilter::new(filter_directives(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// Pick the effective level. An unparsable env value is skipped.
pub fn resolve_level(
    cli_level: Option<LogLevel>,
    env_level: Option<&str>,
    config_level: Option<LogLevel>,
) -> Level {
    cli_level
        .map(level_from_log_level)
        .or_else(|| env_level.and_then(parse_level_str))
        .or_else(|| config_level.map(level_from_log_level))
        .unwrap_or(Level::INFO)
}

/// `EnvFilter` directives: `level` for labpilot, at most `warn` elsewhere.
fn filter_directives(level: Level) -> String {
    let deps = std::cmp::min(level, Level::WARN);
    format!(
        "{},labpilot={}",
        deps.as_str().to_ascii_lowercase(),
        level.as_str().to_ascii_lowercase()
    )
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
