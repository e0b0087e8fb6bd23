// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::cli::LogLevel;
use crate::types::SinkKind;

/// Configuration as read from a `.labpilot.yaml` file.
///
/// ```yaml
/// server_name: gpu-node-3
/// database:
///   path: ./labpilot.db
/// timeout:
///   default: 86400
/// logging:
///   max_log_lines: 20
///   level: info
/// git:
///   auto_snapshot: true
///   require_clean: false
/// ai:
///   api_key: sk-...
///   model: glm-4
/// notification:
///   active: [dingtalk, ntfy]
///   dingtalk:
///     webhook_url: https://oapi.dingtalk.com/robot/send?access_token=...
///     secret: SEC...
///   ntfy:
///     topic: my-experiments
/// ```
///
/// Every section is optional; missing values fall back to the defaults
/// below. This is the unchecked form; the rest of the crate works with the
/// validated [`LabConfig`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Overrides the host name recorded in `server`.
    #[serde(default)]
    pub server_name: Option<String>,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub timeout: TimeoutSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub git: GitSection,

    #[serde(default)]
    pub ai: AiSection,

    #[serde(default)]
    pub notification: NotificationSection,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`LabConfig::new_unchecked`].
#[derive(Debug, Clone)]
pub struct LabConfig {
    pub server_name: Option<String>,
    pub database: DatabaseSection,
    pub timeout: TimeoutSection,
    pub logging: LoggingSection,
    pub git: GitSection,
    pub ai: AiSection,
    pub notification: NotificationSection,
    /// Parsed form of `notification.active`, `None` when the key is absent.
    pub active_sinks: Option<Vec<SinkKind>>,
}

impl LabConfig {
    pub fn new_unchecked(raw: RawConfigFile, active_sinks: Option<Vec<SinkKind>>) -> Self {
        Self {
            server_name: raw.server_name,
            database: raw.database,
            timeout: raw.timeout,
            logging: raw.logging,
            git: raw.git,
            ai: raw.ai,
            notification: raw.notification,
            active_sinks,
        }
    }

    /// Timeout for a run: the CLI value if given, else `timeout.default`.
    ///
    /// Zero or a negative value from either source means unbounded.
    pub fn effective_timeout(&self, cli_timeout: Option<i64>) -> Option<Duration> {
        let secs = cli_timeout.unwrap_or(self.timeout.default);
        u64::try_from(secs)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        LabConfig::new_unchecked(RawConfigFile::default(), None)
    }
}

/// `database` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "./labpilot.db".to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// `timeout` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSection {
    /// Wall-clock limit in seconds; `0` or less disables the limit.
    #[serde(default = "default_timeout_secs")]
    pub default: i64,
}

fn default_timeout_secs() -> i64 {
    86_400
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            default: default_timeout_secs(),
        }
    }
}

/// `logging` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Number of trailing output lines kept in `log_snippet`.
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,

    /// Level for labpilot's own diagnostics; overridden by `--log-level`
    /// and `LABPILOT_LOG`.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

fn default_max_log_lines() -> usize {
    20
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            max_log_lines: default_max_log_lines(),
            level: None,
        }
    }
}

/// `git` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GitSection {
    /// Commit a dirty tree before the run.
    #[serde(default = "default_true")]
    pub auto_snapshot: bool,

    /// Refuse to run on a dirty tree. Checked before `auto_snapshot`.
    #[serde(default)]
    pub require_clean: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GitSection {
    fn default() -> Self {
        Self {
            auto_snapshot: true,
            require_clean: false,
        }
    }
}

/// `ai` section, used for snapshot commit messages.
///
/// The generator is disabled unless `api_key` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct AiSection {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_ai_base_url")]
    pub base_url: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_ai_timeout")]
    pub timeout: u64,

    #[serde(default = "default_ai_temperature")]
    pub temperature: f32,
}

fn default_ai_base_url() -> String {
    "https://open.bigmodel.cn/api/paas/v4/".to_string()
}

fn default_ai_model() -> String {
    "glm-4".to_string()
}

fn default_ai_timeout() -> u64 {
    120
}

fn default_ai_temperature() -> f32 {
    0.7
}

impl Default for AiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            timeout: default_ai_timeout(),
            temperature: default_ai_temperature(),
        }
    }
}

impl AiSection {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// `notification.active` accepts a single name or a list of names.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ActiveSinks {
    One(String),
    Many(Vec<String>),
}

impl ActiveSinks {
    pub fn names(&self) -> Vec<&str> {
        match self {
            ActiveSinks::One(name) => vec![name.as_str()],
            ActiveSinks::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// `notification` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationSection {
    /// Which sinks to instantiate. When absent, inferred from which sink has
    /// its required setting filled in.
    #[serde(default)]
    pub active: Option<ActiveSinks>,

    #[serde(default)]
    pub dingtalk: DingtalkSection,

    #[serde(default)]
    pub ntfy: NtfySection,
}

/// `notification.dingtalk` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DingtalkSection {
    #[serde(default)]
    pub webhook_url: String,

    /// Shared secret for request signing; signing is skipped when empty.
    #[serde(default)]
    pub secret: String,

    /// Request timeout in seconds.
    #[serde(default = "default_sink_timeout")]
    pub timeout: u64,
}

fn default_sink_timeout() -> u64 {
    5
}

impl Default for DingtalkSection {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            secret: String::new(),
            timeout: default_sink_timeout(),
        }
    }
}

/// `notification.ntfy` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NtfySection {
    #[serde(default = "default_ntfy_server")]
    pub server: String,

    #[serde(default)]
    pub topic: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Request timeout in seconds.
    #[serde(default = "default_sink_timeout")]
    pub timeout: u64,
}

fn default_ntfy_server() -> String {
    "https://ntfy.sh".to_string()
}

impl Default for NtfySection {
    fn default() -> Self {
        Self {
            server: default_ntfy_server(),
            topic: String::new(),
            username: String::new(),
            password: String::new(),
            timeout: default_sink_timeout(),
        }
    }
}
