//! Lifecycle event formatting and dispatch.

use std::time::Duration;

use tracing::warn;

use crate::notify::{Notification, NotificationSink};
use crate::types::Priority;

/// Characters of log shown in success / failure notifications.
pub const SNIPPET_PREVIEW_CHARS: usize = 100;

/// Identifies the run in every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub server: String,
    pub command: String,
    pub commit_hash: String,
}

impl RunSummary {
    fn header(&self) -> String {
        format!(
            "[{}] {}\nCommit: {}",
            self.server,
            self.command,
            short_hash(&self.commit_hash)
        )
    }
}

/// First seven characters of a commit identity.
pub fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(7) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

/// `"{h}h {m}m {s}s"`.
pub fn format_duration_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(SNIPPET_PREVIEW_CHARS).collect();
    format!("{head}...")
}

pub fn start_notification(run: &RunSummary) -> Notification {
    Notification {
        title: "⏳ Experiment started".to_string(),
        message: run.header(),
        tags: "hourglass_done".to_string(),
        priority: Priority::Default,
    }
}

pub fn success_notification(
    run: &RunSummary,
    duration: Duration,
    ckpt_path: &str,
    log_snippet: &str,
) -> Notification {
    let mut message = format!("{}\nDuration: {}", run.header(), format_duration_hms(duration));
    if !ckpt_path.is_empty() {
        message.push_str(&format!("\nModel: {ckpt_path}"));
    }
    if !log_snippet.is_empty() {
        message.push_str(&format!("\nLog: {}", preview(log_snippet)));
    }

    Notification {
        title: "✅ Experiment succeeded".to_string(),
        message,
        tags: "white_check_mark".to_string(),
        priority: Priority::Default,
    }
}

pub fn failure_notification(
    run: &RunSummary,
    exit_code: i32,
    duration: Duration,
    error_snippet: &str,
) -> Notification {
    let mut message = format!(
        "{}\nExit code: {exit_code}\nDuration: {}",
        run.header(),
        format_duration_hms(duration)
    );
    if !error_snippet.is_empty() {
        message.push_str(&format!("\nError: {}", preview(error_snippet)));
    }

    Notification {
        title: "❌ Experiment failed".to_string(),
        message,
        tags: "x".to_string(),
        priority: Priority::High,
    }
}

pub fn test_notification() -> Notification {
    Notification {
        title: "LabPilot Test".to_string(),
        message: "This is a test notification from LabPilot".to_string(),
        tags: "test".to_string(),
        priority: Priority::Default,
    }
}

/// Sends lifecycle events through a single (possibly composite) sink.
pub struct Notifier {
    sink: Box<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Box<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub async fn start(&self, run: &RunSummary) -> bool {
        self.dispatch("start", start_notification(run)).await
    }

    pub async fn success(
        &self,
        run: &RunSummary,
        duration: Duration,
        ckpt_path: &str,
        log_snippet: &str,
    ) -> bool {
        self.dispatch(
            "success",
            success_notification(run, duration, ckpt_path, log_snippet),
        )
        .await
    }

    pub async fn failure(
        &self,
        run: &RunSummary,
        exit_code: i32,
        duration: Duration,
        error_snippet: &str,
    ) -> bool {
        self.dispatch(
            "failure",
            failure_notification(run, exit_code, duration, error_snippet),
        )
        .await
    }

    pub async fn test(&self) -> bool {
        self.dispatch("test", test_notification()).await
    }

    async fn dispatch(&self, event: &str, notification: Notification) -> bool {
        let delivered = self.sink.send(&notification).await;
        if !delivered {
            warn!(event, sink = self.sink.name(), "notification was not delivered");
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> RunSummary {
        RunSummary {
            server: "gpu-1".to_string(),
            command: "python train.py --lr 0.01".to_string(),
            commit_hash: "0123456789abcdef".to_string(),
        }
    }

    #[test]
    fn start_message_layout() {
        let n = start_notification(&run());
        assert_eq!(n.message, "[gpu-1] python train.py --lr 0.01\nCommit: 0123456");
        assert_eq!(n.priority, Priority::Default);
        assert_eq!(n.tags, "hourglass_done");
    }

    #[test]
    fn success_message_includes_optional_parts() {
        let n = success_notification(&run(), Duration::from_secs(3725), "ckpt/best.pt", "done");
        assert_eq!(
            n.message,
            "[gpu-1] python train.py --lr 0.01\nCommit: 0123456\nDuration: 1h 2m 5s\n\
             Model: ckpt/best.pt\nLog: done..."
        );

        let bare = success_notification(&run(), Duration::from_secs(1), "", "");
        assert!(!bare.message.contains("Model:"));
        assert!(!bare.message.contains("Log:"));
    }

    #[test]
    fn failure_is_high_priority_with_truncated_error() {
        let long = "e".repeat(300);
        let n = failure_notification(&run(), 124, Duration::from_secs(59), &long);
        assert_eq!(n.priority, Priority::High);
        assert!(n.message.contains("Exit code: 124"));
        assert!(n.message.contains("Duration: 0h 0m 59s"));
        let error_line = n.message.lines().last().unwrap();
        assert_eq!(error_line, format!("Error: {}...", "e".repeat(100)));
    }

    #[test]
    fn short_hash_handles_sentinels() {
        assert_eq!(short_hash("abc"), "abc");
        assert_eq!(short_hash("not-a-git-repo"), "not-a-g");
    }
}
