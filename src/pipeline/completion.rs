use crate::pipeline::language::Language;
use crate::util::truncate_with_ellipsis;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 3_000;

const MAX_ERROR_DETAIL_CHARS: usize = 600;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Failures surfaced by [`CompletionClient::complete`].
///
/// Transient upstream errors (HTTP 5xx and 429, connect/timeout failures)
/// are retried internally; every variant that escapes is permanent.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion failed after {attempts} attempts: {detail}")]
    RetriesExhausted { attempts: u32, detail: String },
    #[error("completion service returned HTTP {status}: {detail}")]
    Upstream { status: u16, detail: String },
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

enum AttemptError {
    Transient(String),
    Fatal(CompletionError),
}

/// Retry behavior as an explicit value so callers and tests can inject
/// their own attempt budget and pacing.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `completed_attempts`, doubling each
    /// time. The exponent is capped so the multiplier cannot overflow.
    fn delay_after(&self, completed_attempts: u32) -> Duration {
        let exponent = completed_attempts.saturating_sub(1).min(8);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            retry,
        })
    }

    /// Send `messages` to the completion service and return the generated
    /// text, prepending the system instruction selected by `language`.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        language: Language,
    ) -> Result<String, CompletionError> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(ChatMessage::system(language.system_instruction()));
        full.extend_from_slice(messages);
        let payload = serde_json::json!({
            "model": self.model,
            "messages": full,
        });

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_once(&payload).await {
                Ok(content) => return Ok(content),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Transient(detail)) => {
                    if attempt >= max_attempts {
                        return Err(CompletionError::RetriesExhausted {
                            attempts: attempt,
                            detail,
                        });
                    }
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %detail,
                        "transient completion failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(&self, payload: &Value) -> Result<String, AttemptError> {
        let mut request = self.http.post(&self.endpoint).json(payload);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() || err.is_connect() {
                AttemptError::Transient(err.to_string())
            } else {
                AttemptError::Fatal(CompletionError::Transport(err.to_string()))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            let json: Value = response.json().await.map_err(|err| {
                AttemptError::Fatal(CompletionError::MalformedResponse(format!(
                    "response body is not JSON: {err}"
                )))
            })?;
            return extract_message_content(&json)
                .map_err(|missing| AttemptError::Fatal(CompletionError::MalformedResponse(missing)));
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let detail = truncate_with_ellipsis(&body, MAX_ERROR_DETAIL_CHARS);
        if status.is_server_error() || code == 429 {
            return Err(AttemptError::Transient(format!("HTTP {code}: {detail}")));
        }
        Err(AttemptError::Fatal(CompletionError::Upstream {
            status: code,
            detail,
        }))
    }
}

/// One completion call, abstracted so the batch summarizer and the chat
/// flow can run against a stub backend in tests.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        language: Language,
    ) -> Result<String, CompletionError>;
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        language: Language,
    ) -> Result<String, CompletionError> {
        CompletionClient::complete(self, messages, language).await
    }
}

fn extract_message_content(json: &Value) -> Result<String, String> {
    let choices = json
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing `choices` array".to_string())?;
    let first = choices
        .first()
        .ok_or_else(|| "empty `choices` array".to_string())?;
    let message = first
        .get("message")
        .ok_or_else(|| "missing `choices[0].message`".to_string())?;
    let content = message
        .get("content")
        .ok_or_else(|| "missing `choices[0].message.content`".to_string())?;
    content
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| "`choices[0].message.content` is not a string".to_string())
}
