use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::time::Duration;

use crate::normalize::l2_normalize_in_place;
use crate::resilience::{execute_with_retry_async, CircuitBreakerManager};
use crate::{SemanticConfig, SemanticError};

static CIRCUIT_BREAKERS: Lazy<CircuitBreakerManager> = Lazy::new(CircuitBreakerManager::default);

// Shared connection pool for every embedding call.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default HTTP client");
            reqwest::Client::new()
        })
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

fn provider_name(cfg: &SemanticConfig) -> String {
    cfg.api_provider
        .as_deref()
        .unwrap_or("custom")
        .to_ascii_lowercase()
}

fn api_provider_kind(cfg: &SemanticConfig) -> ApiProviderKind {
    match provider_name(cfg).as_str() {
        "hf" | "huggingface" => ApiProviderKind::HuggingFace,
        "openai" | "gpt" => ApiProviderKind::OpenAI,
        _ => ApiProviderKind::Custom,
    }
}

/// Embed `texts` with one request to the configured endpoint.
///
/// Returns exactly one vector per input, in input order.
pub(crate) async fn embed_batch_via_api(
    texts: &[String],
    cfg: &SemanticConfig,
) -> Result<Vec<Vec<f32>>, SemanticError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let url = cfg
        .api_url
        .as_deref()
        .ok_or_else(|| SemanticError::InvalidConfig("api_url is required for api mode".into()))?;
    let provider = provider_name(cfg);
    let payload = build_api_payload(api_provider_kind(cfg), texts, cfg);
    let payload = &payload;

    let response = if cfg.enable_resilience {
        let breaker = match cfg.circuit_breaker_config {
            Some(cb_cfg) => CIRCUIT_BREAKERS.get_or_create_with_config(&provider, cb_cfg),
            None => CIRCUIT_BREAKERS.get_or_create(&provider),
        };
        if !breaker.allow_request() {
            return Err(SemanticError::CircuitOpen(provider));
        }

        let retry_cfg = cfg.retry_config.unwrap_or_default();
        let outcome = execute_with_retry_async(
            &retry_cfg,
            |attempt| {
                if attempt > 0 {
                    tracing::debug!(provider = %provider, attempt, "retrying embedding request");
                }
                send_api_request(url, cfg, payload)
            },
            SemanticError::is_retryable,
        )
        .await;

        match outcome.result {
            Ok(value) => {
                breaker.record_success();
                value
            }
            Err(err) => {
                breaker.record_failure();
                tracing::warn!(
                    provider = %provider,
                    attempts = outcome.attempts,
                    error = %err,
                    "embedding request failed"
                );
                return Err(err);
            }
        }
    } else {
        send_api_request(url, cfg, payload).await?
    };

    let mut vectors = parse_embeddings_from_value(response)?;
    if vectors.len() != texts.len() {
        return Err(SemanticError::Inference(format!(
            "API returned {} embeddings for {} inputs",
            vectors.len(),
            texts.len()
        )));
    }

    if cfg.normalize {
        for v in &mut vectors {
            l2_normalize_in_place(v);
        }
    }
    Ok(vectors)
}

fn build_api_payload(provider: ApiProviderKind, texts: &[String], cfg: &SemanticConfig) -> Value {
    match provider {
        ApiProviderKind::HuggingFace => json!({
            "inputs": texts,
            "options": { "wait_for_model": true }
        }),
        ApiProviderKind::OpenAI => json!({ "input": texts, "model": cfg.model_name }),
        ApiProviderKind::Custom => json!({ "texts": texts }),
    }
}

async fn send_api_request(
    url: &str,
    cfg: &SemanticConfig,
    payload: &Value,
) -> Result<Value, SemanticError> {
    let mut request = HTTP_CLIENT
        .post(url)
        .timeout(Duration::from_secs(cfg.api_timeout_secs.unwrap_or(30)))
        .json(payload);
    if let Some(header) = cfg.api_auth_header.as_deref() {
        request = request.header(reqwest::header::AUTHORIZATION, header);
    }

    let response = request
        .send()
        .await
        .map_err(|e| SemanticError::Request(format!("HTTP request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SemanticError::Request(format!("HTTP error {status}: {body}")));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| SemanticError::Inference(format!("invalid JSON response: {e}")))
}

/// Accepts a bare `[[..], ..]` array, `{"embeddings": ..}` or the OpenAI
/// `{"data": [{"embedding": ..}]}` shape.
fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                return items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => obj
                            .remove("embedding")
                            .ok_or_else(|| {
                                SemanticError::Inference(
                                    "missing `embedding` field in data item".into(),
                                )
                            })
                            .and_then(parse_embedding_vector),
                        _ => Err(SemanticError::Inference(
                            "unexpected entry inside `data` array".into(),
                        )),
                    })
                    .collect();
            }

            Err(SemanticError::Inference(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| SemanticError::Inference("non-finite embedding value".into())),
                other => Err(SemanticError::Inference(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::Inference(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}

/// `(provider, state, consecutive failures)` for every provider seen so far.
pub fn circuit_breaker_stats() -> Vec<(String, crate::resilience::CircuitState, u32)> {
    CIRCUIT_BREAKERS.stats()
}

pub fn is_provider_healthy(provider: &str) -> bool {
    CIRCUIT_BREAKERS.is_healthy(provider)
}
