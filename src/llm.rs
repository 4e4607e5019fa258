//! Language-model client abstraction.
//!
//! Defines the [`CompletionClient`] trait, the production
//! [`AnthropicClient`] (Messages API), and [`complete_with_retry`], which
//! wraps any client in the retry policy.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - Connect and timeout failures → retry
//! - Any other HTTP 4xx, or a malformed response envelope → fail immediately
//! - Backoff before retry `n`: `base * 2^n + n * base / 10`
//!   (1.0s, 2.1s, 4.2s, ... with the default 1000 ms base)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{AnalysisError, RemoteError};

/// One prompt-in, text-out request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn from_config(prompt: String, config: &LlmConfig) -> Self {
        Self {
            prompt,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// A remote model that turns a prompt into reply text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Model identifier, used in logs.
    fn model_name(&self) -> &str;

    /// Perform exactly one remote call.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, RemoteError>;
}

/// Delay before retry number `attempt` (0-based).
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
    let linear = (attempt as u64).saturating_mul(base_ms / 10);
    Duration::from_millis(exp.saturating_add(linear))
}

/// Call `client` up to `config.max_retries` times, backing off between
/// transient failures.
pub async fn complete_with_retry(
    client: &dyn CompletionClient,
    request: &CompletionRequest,
    config: &LlmConfig,
) -> Result<String, AnalysisError> {
    let max_attempts = config.max_retries.max(1);
    let mut attempt = 0u32;

    loop {
        tracing::debug!(
            model = client.model_name(),
            attempt = attempt + 1,
            max_attempts,
            "calling model"
        );

        match client.complete(request).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                let delay = backoff_delay(attempt, config.retry_base_ms);
                tracing::warn!(
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    attempt = attempt + 1,
                    max_attempts,
                    "model call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, attempt = attempt + 1, "model call failed");
                return Err(AnalysisError::Remote {
                    attempts: attempt + 1,
                    source: e,
                });
            }
        }
    }
}

// ============ Anthropic ============

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
///
/// Requires the API key in the environment variable named by
/// `llm.api_key_env` (default `ANTHROPIC_API_KEY`). The model can be
/// overridden with `ANTHROPIC_MODEL`.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", config.api_key_env),
        };

        let model = std::env::var("ANTHROPIC_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| config.model.clone());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, RemoteError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();

        if status.is_success() {
            let json: serde_json::Value =
                response.json().await.map_err(|e| RemoteError::Permanent {
                    status: Some(status.as_u16()),
                    message: format!("invalid response body: {}", e),
                })?;
            return parse_messages_response(&json);
        }

        let body_text = response.text().await.unwrap_or_default();

        // Rate limited or server error: retry
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(RemoteError::Transient {
                status: Some(status.as_u16()),
                message: body_text,
            });
        }

        Err(RemoteError::Permanent {
            status: Some(status.as_u16()),
            message: body_text,
        })
    }
}

fn classify_send_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        RemoteError::Transient {
            status: None,
            message: e.to_string(),
        }
    } else {
        RemoteError::Permanent {
            status: None,
            message: e.to_string(),
        }
    }
}

/// Extract `content[0].text` from a Messages API response.
fn parse_messages_response(json: &serde_json::Value) -> Result<String, RemoteError> {
    json.get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b.get("type").and_then(|t| t.as_str()).unwrap_or("text") == "text")
        })
        .and_then(|b| b.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Permanent {
            status: None,
            message: "invalid response: missing content[0].text".to_string(),
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of results, then repeats the last one.
    pub(crate) struct ScriptedClient {
        script: Mutex<Vec<Result<String, RemoteError>>>,
        pub(crate) calls: AtomicU32,
    }

    impl ScriptedClient {
        pub(crate) fn new(script: Vec<Result<String, RemoteError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        }
    }
}
