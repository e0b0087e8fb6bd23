use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Boxed future used at the trait seams (sinks, VCS provider, executor) so
/// the traits stay object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Commit identity recorded when the working directory is not a repository.
pub const NOT_A_GIT_REPO: &str = "not-a-git-repo";

/// Commit identity recorded when a git query fails inside a repository.
pub const UNKNOWN: &str = "unknown";

/// Exit code reported for runs killed by the wall-clock timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported when the child could not be spawned.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 1;

/// Lifecycle status of an experiment record.
///
/// `Running` is the only non-terminal state; a record moves to `Success` or
/// `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            RunStatus::Success
        } else {
            RunStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!(
                "invalid run status: {other} (expected \"running\", \"success\" or \"failed\")"
            )),
        }
    }
}

/// Delivery priority of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Default,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Default => "default",
            Priority::High => "high",
        }
    }
}

/// Notification backends that can be named in `notification.active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// Signed markdown webhook (DingTalk group robot).
    Dingtalk,
    /// Topic based push service (ntfy).
    Ntfy,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Dingtalk => "dingtalk",
            SinkKind::Ntfy => "ntfy",
        }
    }
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dingtalk" => Ok(SinkKind::Dingtalk),
            "ntfy" => Ok(SinkKind::Ntfy),
            other => Err(format!(
                "unknown notification sink: {other} (expected \"dingtalk\" or \"ntfy\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_exit_code() {
        assert_eq!(RunStatus::from_exit_code(0), RunStatus::Success);
        assert_eq!(RunStatus::from_exit_code(1), RunStatus::Failed);
        assert_eq!(RunStatus::from_exit_code(TIMEOUT_EXIT_CODE), RunStatus::Failed);
        assert_eq!(RunStatus::from_exit_code(-9), RunStatus::Failed);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [RunStatus::Running, RunStatus::Success, RunStatus::Failed] {
            assert_eq!(status.as_str().parse::<RunStatus>().unwrap(), status);
        }
        assert!("done".parse::<RunStatus>().is_err());
    }

    #[test]
    fn sink_kind_parsing_is_case_insensitive() {
        assert_eq!(" DingTalk ".parse::<SinkKind>().unwrap(), SinkKind::Dingtalk);
        assert_eq!("ntfy".parse::<SinkKind>().unwrap(), SinkKind::Ntfy);
        assert!("slack".parse::<SinkKind>().is_err());
    }
}
