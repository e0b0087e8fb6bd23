// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabpilotError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The working tree is dirty and `git.require_clean` is set.
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    #[error("Record store error: {0}")]
    StoreError(String),

    #[error("Experiment record not found: {0}")]
    RecordNotFound(i64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LabpilotError>;
