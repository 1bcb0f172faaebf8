use serde::{Deserialize, Serialize};

use semantic::resilience::RetryConfig;

use crate::NamingError;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

fn default_mode() -> String {
    "chat".into()
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_api_url() -> String {
    OPENAI_CHAT_URL.into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    30
}

fn default_title_temperature() -> f32 {
    0.5
}

fn default_title_max_tokens() -> u32 {
    15
}

fn default_timeout_secs() -> u64 {
    20
}

/// Settings for the label generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// `"chat"` (OpenAI-compatible endpoint) or `"stub"` (offline).
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Falls back to `OPENAI_API_KEY` when unset. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Sampling temperature for category names.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_title_temperature")]
    pub title_temperature: f32,
    #[serde(default = "default_title_max_tokens")]
    pub title_max_tokens: u32,
    /// Per HTTP call, retries excluded.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            model: default_model(),
            api_url: default_api_url(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            title_temperature: default_title_temperature(),
            title_max_tokens: default_title_max_tokens(),
            timeout_secs: default_timeout_secs(),
            retry_config: None,
        }
    }
}

impl NamingConfig {
    pub fn stub() -> Self {
        Self {
            mode: "stub".into(),
            ..Self::default()
        }
    }

    /// Configured key, else the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), NamingError> {
        if !matches!(self.mode.as_str(), "chat" | "stub") {
            return Err(NamingError::InvalidConfig(format!(
                "unknown naming mode '{}' (expected 'chat' or 'stub')",
                self.mode
            )));
        }
        for (name, t) in [
            ("temperature", self.temperature),
            ("title_temperature", self.title_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(NamingError::InvalidConfig(format!(
                    "{name} must be within [0, 2], got {t}"
                )));
            }
        }
        if self.max_tokens == 0 || self.title_max_tokens == 0 {
            return Err(NamingError::InvalidConfig(
                "max_tokens must be greater than 0".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(NamingError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.mode == "chat" && self.model.trim().is_empty() {
            return Err(NamingError::InvalidConfig("model must not be empty".into()));
        }
        Ok(())
    }
}
