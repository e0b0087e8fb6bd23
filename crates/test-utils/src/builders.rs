#![allow(dead_code)]

use labpilot::config::{ActiveSinks, LabConfig, RawConfigFile};

/// Builder for `LabConfig` to simplify test setup.
///
/// Goes through the same `TryFrom` validation as a config file.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn server_name(mut self, name: &str) -> Self {
        self.config.server_name = Some(name.to_string());
        self
    }

    pub fn database_path(mut self, path: &str) -> Self {
        self.config.database.path = path.to_string();
        self
    }

    pub fn default_timeout(mut self, secs: i64) -> Self {
        self.config.timeout.default = secs;
        self
    }

    pub fn max_log_lines(mut self, lines: usize) -> Self {
        self.config.logging.max_log_lines = lines;
        self
    }

    pub fn require_clean(mut self, val: bool) -> Self {
        self.config.git.require_clean = val;
        self
    }

    pub fn auto_snapshot(mut self, val: bool) -> Self {
        self.config.git.auto_snapshot = val;
        self
    }

    pub fn dingtalk(mut self, webhook_url: &str, secret: &str) -> Self {
        self.config.notification.dingtalk.webhook_url = webhook_url.to_string();
        self.config.notification.dingtalk.secret = secret.to_string();
        self
    }

    pub fn ntfy(mut self, server: &str, topic: &str) -> Self {
        self.config.notification.ntfy.server = server.to_string();
        self.config.notification.ntfy.topic = topic.to_string();
        self
    }

    pub fn ntfy_auth(mut self, username: &str, password: &str) -> Self {
        self.config.notification.ntfy.username = username.to_string();
        self.config.notification.ntfy.password = password.to_string();
        self
    }

    pub fn active(mut self, names: &[&str]) -> Self {
        self.config.notification.active = Some(ActiveSinks::Many(
            names.iter().map(|n| n.to_string()).collect(),
        ));
        self
    }

    pub fn ai(mut self, base_url: &str, api_key: &str) -> Self {
        self.config.ai.base_url = base_url.to_string();
        self.config.ai.api_key = Some(api_key.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> LabConfig {
        LabConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
