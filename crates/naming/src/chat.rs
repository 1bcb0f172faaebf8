use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use semantic::resilience::execute_with_retry_async;

use crate::prompt::{clean_output, label_messages, title_messages};
use crate::{LabelGenerator, NamingConfig, NamingError, TitleGenerator};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default HTTP client");
            reqwest::Client::new()
        })
});

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct ChatLabeler {
    cfg: NamingConfig,
    api_key: String,
}

impl std::fmt::Debug for ChatLabeler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatLabeler")
            .field("model", &self.cfg.model)
            .field("api_url", &self.cfg.api_url)
            .finish_non_exhaustive()
    }
}

impl ChatLabeler {
    /// Fails when the config is invalid or no API key can be found.
    pub fn new(cfg: NamingConfig) -> Result<Self, NamingError> {
        cfg.validate()?;
        let api_key = cfg.resolved_api_key().ok_or_else(|| {
            NamingError::InvalidConfig(format!(
                "an api_key or the {} environment variable is required",
                crate::config::API_KEY_ENV
            ))
        })?;
        Ok(Self { cfg, api_key })
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    async fn complete(
        &self,
        messages: Value,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, NamingError> {
        let body = json!({
            "model": self.cfg.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        let body = &body;

        let retry_cfg = self.cfg.retry_config.unwrap_or_default();
        let outcome = execute_with_retry_async(
            &retry_cfg,
            |_| self.send(body),
            NamingError::is_retryable,
        )
        .await;

        if outcome.attempts > 1 {
            tracing::debug!(
                attempts = outcome.attempts,
                elapsed_ms = outcome.total_duration.as_millis() as u64,
                "chat completion needed retries"
            );
        }
        outcome.into_result()
    }

    async fn send(&self, body: &Value) -> Result<String, NamingError> {
        let response = HTTP_CLIENT
            .post(&self.cfg.api_url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.cfg.timeout_secs))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NamingError::Request(format!("HTTP error {status}: {text}")));
        }

        let value: Value = response.json().await.map_err(|e| self.transport_error(e))?;
        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| NamingError::Response("missing choices[0].message.content".into()))?;

        clean_output(content).ok_or(NamingError::Empty)
    }

    fn transport_error(&self, err: reqwest::Error) -> NamingError {
        if err.is_timeout() {
            NamingError::Timeout(Duration::from_secs(self.cfg.timeout_secs))
        } else if err.is_decode() {
            NamingError::Response(format!("invalid JSON response: {err}"))
        } else {
            NamingError::Request(format!("HTTP request failed: {err}"))
        }
    }
}

#[async_trait]
impl LabelGenerator for ChatLabeler {
    async fn generate_label(&self, samples: &[String]) -> Result<String, NamingError> {
        if samples.is_empty() {
            return Err(NamingError::Empty);
        }
        self.complete(
            label_messages(samples),
            self.cfg.temperature,
            self.cfg.max_tokens,
        )
        .await
    }
}

#[async_trait]
impl TitleGenerator for ChatLabeler {
    async fn generate_title(&self, summary: &str) -> Result<String, NamingError> {
        self.complete(
            title_messages(summary),
            self.cfg.title_temperature,
            self.cfg.title_max_tokens,
        )
        .await
    }
}
