//! DingTalk group robot: markdown messages posted to a signed webhook.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, info};

use crate::clock;
use crate::config::DingtalkSection;
use crate::notify::{Notification, NotificationSink};
use crate::types::BoxFuture;

type HmacSha256 = Hmac<Sha256>;

/// Base64 HMAC-SHA256 of `"<timestamp>\n<secret>"` keyed by `secret`.
pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String> {
    let string_to_sign = format!("{timestamp_ms}\n{secret}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .context("initialising HMAC-SHA256")?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Webhook URL with `timestamp` and `sign` query parameters appended.
pub fn signed_url(webhook_url: &str, secret: &str, timestamp_ms: i64) -> Result<Url> {
    let mut url = Url::parse(webhook_url)
        .with_context(|| format!("invalid DingTalk webhook_url {webhook_url:?}"))?;
    let signature = sign(secret, timestamp_ms)?;
    url.query_pairs_mut()
        .append_pair("timestamp", &timestamp_ms.to_string())
        .append_pair("sign", &signature);
    Ok(url)
}

#[derive(Debug, Serialize)]
struct MarkdownPayload<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: String,
}

/// DingTalk answers HTTP 200 even for rejected messages; the verdict is in
/// `errcode`.
#[derive(Debug, Deserialize)]
struct RobotResponse {
    errcode: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
}

fn payload(notification: &Notification) -> MarkdownPayload<'_> {
    MarkdownPayload {
        msgtype: "markdown",
        markdown: MarkdownBody {
            title: &notification.title,
            text: format!("## {}\n{}", notification.title, notification.message),
        },
    }
}

pub struct DingtalkSink {
    client: reqwest::Client,
    settings: DingtalkSection,
}

impl DingtalkSink {
    pub fn new(client: reqwest::Client, settings: DingtalkSection) -> Self {
        Self { client, settings }
    }

    fn target_url(&self) -> Result<Url> {
        let webhook = self.settings.webhook_url.trim();
        if self.settings.secret.is_empty() {
            Url::parse(webhook).with_context(|| format!("invalid DingTalk webhook_url {webhook:?}"))
        } else {
            signed_url(webhook, &self.settings.secret, clock::now_millis())
        }
    }

    async fn deliver(&self, notification: &Notification) -> Result<RobotResponse> {
        let url = self.target_url()?;
        let response = self
            .client
            .post(url)
            .timeout(Duration::from_secs(self.settings.timeout))
            .json(&payload(notification))
            .send()
            .await
            .context("sending DingTalk webhook request")?;

        response
            .json::<RobotResponse>()
            .await
            .context("decoding DingTalk webhook response")
    }
}

impl NotificationSink for DingtalkSink {
    fn name(&self) -> &str {
        "dingtalk"
    }

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            if self.settings.webhook_url.trim().is_empty() {
                error!(sink = "dingtalk", "notification.dingtalk.webhook_url is not configured");
                return false;
            }

            match self.deliver(notification).await {
                Ok(RobotResponse { errcode: Some(0), .. }) => {
                    info!(sink = "dingtalk", title = %notification.title, "notification sent");
                    true
                }
                Ok(RobotResponse { errcode, errmsg }) => {
                    error!(
                        sink = "dingtalk",
                        ?errcode,
                        errmsg = errmsg.as_deref().unwrap_or(""),
                        "DingTalk rejected the notification"
                    );
                    false
                }
                Err(e) => {
                    error!(sink = "dingtalk", error = %format!("{e:#}"), "sending notification failed");
                    false
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;

    #[test]
    fn signature_is_time_bound() {
        let a = sign("SECabc", 1_700_000_000_000).unwrap();
        let b = sign("SECabc", 1_700_000_000_001).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, sign("SECabc", 1_700_000_000_000).unwrap());
    }

    #[test]
    fn signature_matches_reference_construction() {
        // HMAC-SHA256(key="secret", msg="1000\nsecret"), base64.
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"1000\nsecret");
        let expected = BASE64_STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(sign("secret", 1000).unwrap(), expected);
    }

    #[test]
    fn signed_url_keeps_existing_query() {
        let url = signed_url(
            "https://oapi.dingtalk.com/robot/send?access_token=tok",
            "SECabc",
            42,
        )
        .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(pairs[0], ("access_token".to_string(), "tok".to_string()));
        assert_eq!(pairs[1], ("timestamp".to_string(), "42".to_string()));
        assert_eq!(pairs[2].0, "sign");
        assert_eq!(pairs[2].1, sign("SECabc", 42).unwrap());
    }

    #[test]
    fn payload_is_markdown_with_heading() {
        let n = Notification {
            title: "Run".to_string(),
            message: "body".to_string(),
            tags: String::new(),
            priority: Priority::Default,
        };
        let value = serde_json::to_value(payload(&n)).unwrap();
        assert_eq!(value["msgtype"], "markdown");
        assert_eq!(value["markdown"]["title"], "Run");
        assert_eq!(value["markdown"]["text"], "## Run\nbody");
    }
}
