//! Snapshot commit messages.
//!
//! Order of preference: an explicit message, then an AI summary of the diff
//! (OpenAI-compatible chat completions endpoint), then a timestamped label.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::AiSection;
use crate::retry::{retry_with_backoff, RetryDisposition, RetryPolicy};

/// Characters of diff sent to the model.
pub const DIFF_BUDGET_CHARS: usize = 3000;

const TRUNCATION_MARKER: &str = "\n... (truncated)";

const SYSTEM_PROMPT: &str = "You are a professional assistant that writes git commit messages.";

/// Timestamped label used when no better message is available.
pub fn fallback_message(stamp: &str) -> String {
    format!("Auto-snapshot before experiment run [labpilot-{stamp}]")
}

/// Cut `diff` to [`DIFF_BUDGET_CHARS`] characters, marking the cut.
pub fn truncate_diff(diff: &str) -> String {
    match diff.char_indices().nth(DIFF_BUDGET_CHARS) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &diff[..byte_idx]),
        None => diff.to_string(),
    }
}

/// `<base_url>/chat/completions`, unless the base already points there.
pub fn completions_url(base_url: &str) -> String {
    let base = base_url.trim();
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

fn build_prompt(diff: &str) -> String {
    format!(
        "Write a concise git commit message for the following code changes (git diff).\n\
         Format:\n\
         1. First line: a short summary (at most 50 characters)\n\
         2. Second line: blank\n\
         3. From the third line: a description of the changes\n\
         \n\
         Changes:\n\
         {diff}\n"
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Error)]
enum AiRequestError {
    #[error("rate limited (HTTP 429): {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl AiRequestError {
    /// Rate limits and network-level failures are worth another attempt;
    /// anything else falls through to the timestamped label.
    fn disposition(&self) -> RetryDisposition {
        match self {
            AiRequestError::RateLimited(_) | AiRequestError::Transport(_) => {
                RetryDisposition::Retry
            }
            AiRequestError::Status { .. } | AiRequestError::Malformed(_) => {
                RetryDisposition::Abort
            }
        }
    }
}

/// Generates commit messages through a chat completions API.
#[derive(Debug, Clone)]
pub struct AiCommitMessenger {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl AiCommitMessenger {
    /// `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, ai: &AiSection) -> Option<Self> {
        let api_key = ai.api_key()?.to_string();
        Some(Self {
            client,
            url: completions_url(&ai.base_url),
            api_key,
            model: ai.model.clone(),
            temperature: ai.temperature,
            timeout: Duration::from_secs(ai.timeout),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Summarise `diff`; `None` on empty diff or any failure.
    pub async fn generate(&self, diff: &str) -> Option<String> {
        if diff.trim().is_empty() {
            debug!("empty diff; skipping AI commit message");
            return None;
        }

        let prompt = build_prompt(&truncate_diff(diff));
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
        };

        let result = retry_with_backoff(
            self.retry,
            |_attempt| self.request_once(&request),
            AiRequestError::disposition,
            |attempt, delay, err| {
                warn!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    error = %err,
                    "AI commit message request failed; retrying"
                );
            },
        )
        .await;

        match result {
            Ok(message) if !message.is_empty() => Some(message),
            Ok(_) => {
                warn!("AI commit message was empty");
                None
            }
            Err(err) => {
                error!(
                    error = %err,
                    timeout_secs = self.timeout.as_secs(),
                    "AI commit message unavailable"
                );
                None
            }
        }
    }

    async fn request_once(&self, request: &ChatRequest<'_>) -> Result<String, AiRequestError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(AiRequestError::Transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(AiRequestError::RateLimited(body));
        }
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AiRequestError::Status { status, body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiRequestError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| AiRequestError::Malformed("no choices in response".to_string()))
    }
}
