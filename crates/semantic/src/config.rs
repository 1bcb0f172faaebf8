use serde::{Deserialize, Serialize};

use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::SemanticError;

/// How documents are turned into vectors.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "api".into(),
///     api_url: Some("https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2".into()),
///     api_auth_header: Some("Bearer hf_xxx".into()),
///     api_provider: Some("hf".into()),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// `"api"` (remote feature-extraction endpoint) or `"fast"` (offline stub).
    pub mode: String,
    /// Stub dimension selector: `"fast"` 384, `"balanced"` 768, `"accurate"` 1024.
    pub tier: String,
    /// Reported by [`Embedder::model_name`](crate::Embedder::model_name) and
    /// sent to OpenAI-style providers.
    pub model_name: String,
    pub api_url: Option<String>,
    /// Full `Authorization` header value, e.g. `"Bearer hf_xxx"`.
    pub api_auth_header: Option<String>,
    /// `"hf"`, `"openai"` or `"custom"` (default).
    pub api_provider: Option<String>,
    pub api_timeout_secs: Option<u64>,
    /// L2-normalize every returned vector.
    pub normalize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker_config: Option<CircuitBreakerConfig>,
    /// Retry and circuit breaking around API calls.
    pub enable_resilience: bool,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            tier: "balanced".into(),
            model_name: "all-MiniLM-L6-v2".into(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: Some(30),
            normalize: false,
            retry_config: None,
            circuit_breaker_config: None,
            enable_resilience: true,
        }
    }
}

impl SemanticConfig {
    /// The offline configuration used by tests and local runs.
    pub fn fast() -> Self {
        Self {
            mode: "fast".into(),
            tier: "fast".into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        match self.mode.as_str() {
            "fast" => Ok(()),
            "api" => {
                let url = self.api_url.as_deref().unwrap_or("").trim();
                if url.is_empty() {
                    return Err(SemanticError::InvalidConfig(
                        "api_url is required for api mode".into(),
                    ));
                }
                if self.api_timeout_secs == Some(0) {
                    return Err(SemanticError::InvalidConfig(
                        "api_timeout_secs must be greater than 0".into(),
                    ));
                }
                Ok(())
            }
            other => Err(SemanticError::InvalidConfig(format!(
                "unknown semantic mode '{other}' (expected 'api' or 'fast')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.mode, "api");
        assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
        assert_eq!(cfg.api_timeout_secs, Some(30));
        assert!(cfg.enable_resilience);
        assert!(!cfg.normalize);
    }

    #[test]
    fn api_mode_needs_a_url() {
        let err = SemanticConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("api_url"));

        let cfg = SemanticConfig {
            api_url: Some("http://localhost:9000/embed".into()),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_mode_and_zero_timeout() {
        let cfg = SemanticConfig {
            mode: "onnx".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SemanticConfig {
            api_url: Some("http://localhost/embed".into()),
            api_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert!(SemanticConfig::fast().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: SemanticConfig =
            serde_json::from_str(r#"{"mode":"fast","retry_config":{"max_retries":1}}"#).unwrap();
        assert_eq!(cfg.mode, "fast");
        assert_eq!(cfg.tier, "balanced");
        assert_eq!(cfg.retry_config.map(|r| r.max_retries), Some(1));
    }
}
