//! ntfy topic push: plain text body, metadata in headers.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::StatusCode;
use tracing::{error, info};

use crate::config::NtfySection;
use crate::notify::{Notification, NotificationSink};
use crate::types::BoxFuture;

/// `<server>/<topic>`.
pub fn topic_url(server: &str, topic: &str) -> String {
    format!(
        "{}/{}",
        server.trim().trim_end_matches('/'),
        topic.trim().trim_start_matches('/')
    )
}

/// Header-safe form of `value`: unchanged when printable ASCII, otherwise
/// RFC 2047 encoded (`=?UTF-8?B?...?=`), which ntfy decodes.
pub fn encode_header_value(value: &str) -> String {
    if value.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", BASE64_STANDARD.encode(value.as_bytes()))
    }
}

pub struct NtfySink {
    client: reqwest::Client,
    settings: NtfySection,
}

impl NtfySink {
    pub fn new(client: reqwest::Client, settings: NtfySection) -> Self {
        Self { client, settings }
    }

    async fn deliver(&self, notification: &Notification) -> Result<(StatusCode, String)> {
        let url = topic_url(&self.settings.server, &self.settings.topic);

        let mut request = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.settings.timeout))
            .header("Title", encode_header_value(&notification.title))
            .header("Tags", encode_header_value(&notification.tags))
            .header("Priority", notification.priority.as_str())
            .body(notification.message.clone());

        if !self.settings.username.is_empty() && !self.settings.password.is_empty() {
            request = request.basic_auth(&self.settings.username, Some(&self.settings.password));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("sending ntfy request to {url}"))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

impl NotificationSink for NtfySink {
    fn name(&self) -> &str {
        "ntfy"
    }

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if self.settings.topic.trim().is_empty() {
                error!(sink = "ntfy", "notification.ntfy.topic is not configured");
                return false;
            }

            match self.deliver(notification).await {
                Ok((status, _)) if status == StatusCode::OK => {
                    info!(sink = "ntfy", title = %notification.title, "notification sent");
                    true
                }
                Ok((status, body)) => {
                    error!(sink = "ntfy", %status, body = %body, "ntfy rejected the notification");
                    false
                }
                Err(e) => {
                    error!(sink = "ntfy", error = %format!("{e:#}"), "sending notification failed");
                    false
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_url_normalises_slashes() {
        assert_eq!(topic_url("https://ntfy.sh/", "runs"), "https://ntfy.sh/runs");
        assert_eq!(topic_url("https://ntfy.sh", "/runs"), "https://ntfy.sh/runs");
    }

    #[test]
    fn ascii_headers_pass_through() {
        assert_eq!(encode_header_value("white_check_mark"), "white_check_mark");
    }

    #[test]
    fn non_ascii_headers_are_rfc2047_encoded() {
        let encoded = encode_header_value("✅ Experiment succeeded");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
        let inner = &encoded["=?UTF-8?B?".len()..encoded.len() - 2];
        let decoded = BASE64_STANDARD.decode(inner).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "✅ Experiment succeeded");
    }
}
