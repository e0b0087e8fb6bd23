// src/config/validate.rs

use crate::config::model::{LabConfig, RawConfigFile};
use crate::errors::{LabpilotError, Result};
use crate::types::SinkKind;

impl TryFrom<RawConfigFile> for LabConfig {
    type Error = LabpilotError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_database(&raw)?;
        validate_logging(&raw)?;
        validate_ai(&raw)?;
        let active = parse_active_sinks(&raw)?;
        Ok(LabConfig::new_unchecked(raw, active))
    }
}

fn validate_database(cfg: &RawConfigFile) -> Result<()> {
    if cfg.database.path.trim().is_empty() {
        return Err(LabpilotError::ConfigError(
            "database.path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(cfg: &RawConfigFile) -> Result<()> {
    if cfg.logging.max_log_lines == 0 {
        return Err(LabpilotError::ConfigError(
            "logging.max_log_lines must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_ai(cfg: &RawConfigFile) -> Result<()> {
    if cfg.ai.api_key().is_some() && cfg.ai.base_url.trim().is_empty() {
        return Err(LabpilotError::ConfigError(
            "ai.base_url must not be empty when ai.api_key is set".to_string(),
        ));
    }
    Ok(())
}

fn parse_active_sinks(cfg: &RawConfigFile) -> Result<Option<Vec<SinkKind>>> {
    let Some(active) = &cfg.notification.active else {
        return Ok(None);
    };

    let mut kinds = Vec::new();
    for name in active.names() {
        let kind = name
            .parse::<SinkKind>()
            .map_err(|e| LabpilotError::ConfigError(format!("notification.active: {e}")))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(Some(kinds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ActiveSinks;

    #[test]
    fn active_accepts_single_name_and_deduplicates() {
        let mut raw = RawConfigFile::default();
        raw.notification.active = Some(ActiveSinks::One("ntfy".to_string()));
        let cfg = LabConfig::try_from(raw).unwrap();
        assert_eq!(cfg.active_sinks, Some(vec![SinkKind::Ntfy]));

        let mut raw = RawConfigFile::default();
        raw.notification.active = Some(ActiveSinks::Many(vec![
            "ntfy".to_string(),
            "dingtalk".to_string(),
            "ntfy".to_string(),
        ]));
        let cfg = LabConfig::try_from(raw).unwrap();
        assert_eq!(cfg.active_sinks, Some(vec![SinkKind::Ntfy, SinkKind::Dingtalk]));
    }

    #[test]
    fn zero_log_lines_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.logging.max_log_lines = 0;
        match LabConfig::try_from(raw) {
            Err(LabpilotError::ConfigError(msg)) => assert!(msg.contains("max_log_lines")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }
}
