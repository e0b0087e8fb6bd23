// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{LabConfig, RawConfigFile};
use crate::errors::{LabpilotError, Result};

/// File name looked up in the working directory and the home directory.
pub const CONFIG_FILE_NAME: &str = ".labpilot.yaml";

/// File name of the packaged default shipped next to the executable.
pub const PACKAGED_FILE_NAME: &str = "labpilot.yaml";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs YAML deserialization; it does **not** perform
/// validation. Use [`load_and_validate`] for that. An empty file yields the
/// all-defaults configuration.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    if contents.trim().is_empty() {
        return Ok(RawConfigFile::default());
    }

    let config: RawConfigFile = serde_yaml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<LabConfig> {
    let raw_config = load_from_path(&path)?;
    let config = LabConfig::try_from(raw_config)?;
    Ok(config)
}

/// The configuration layers, highest priority first.
///
/// Lookup is "first existing file wins": layers are never merged.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// `--config <path>`; when set, this file must exist.
    pub explicit: Option<PathBuf>,
    /// `./.labpilot.yaml`
    pub working_dir: Option<PathBuf>,
    /// `~/.labpilot.yaml`
    pub home_dir: Option<PathBuf>,
    /// `labpilot.yaml` next to the executable.
    pub packaged: Option<PathBuf>,
}

impl ConfigSources {
    /// Standard layers for this process.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        let working_dir = std::env::current_dir()
            .ok()
            .map(|dir| dir.join(CONFIG_FILE_NAME));
        let home_dir = dirs::home_dir().map(|dir| dir.join(CONFIG_FILE_NAME));
        let packaged = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(PACKAGED_FILE_NAME)));

        Self {
            explicit,
            working_dir,
            home_dir,
            packaged,
        }
    }

    /// Candidate files in lookup order.
    pub fn candidates(&self) -> Vec<&Path> {
        [
            self.explicit.as_deref(),
            self.working_dir.as_deref(),
            self.home_dir.as_deref(),
            self.packaged.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Resolve the effective configuration.
///
/// Returns the validated config and the file it came from (`None` when no
/// layer exists and defaults are used).
pub fn resolve(sources: &ConfigSources) -> Result<(LabConfig, Option<PathBuf>)> {
    if let Some(explicit) = &sources.explicit {
        if !explicit.is_file() {
            return Err(LabpilotError::ConfigError(format!(
                "config file {} does not exist",
                explicit.display()
            )));
        }
    }

    for candidate in sources.candidates() {
        if candidate.is_file() {
            debug!(path = %candidate.display(), "using configuration file");
            let config = load_and_validate(candidate)?;
            return Ok((config, Some(candidate.to_path_buf())));
        }
    }

    debug!("no configuration file found; using defaults");
    Ok((LabConfig::default(), None))
}
