// src/config/mod.rs

//! Configuration loading and validation for labpilot.
//!
//! Responsibilities:
//! - Define the YAML-backed data model (`model.rs`).
//! - Resolve which layer supplies the config and load it (`loader.rs`).
//! - Validate value-level invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve, ConfigSources, CONFIG_FILE_NAME};
pub use model::{
    ActiveSinks, AiSection, DatabaseSection, DingtalkSection, GitSection, LabConfig,
    LoggingSection, NotificationSection, NtfySection, RawConfigFile, TimeoutSection,
};
