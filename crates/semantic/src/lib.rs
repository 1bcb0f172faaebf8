//! Embedding collaborator for the bookmark clusterer.
//!
//! Turns document text into dense vectors. Two backends:
//!
//! - **API mode** posts the whole batch to a feature-extraction endpoint
//!   (Hugging Face, OpenAI-compatible, or a custom `{"texts": [..]}` service),
//!   with retry and a per-provider circuit breaker.
//! - **Fast mode** is an offline feature-hashing stub. Deterministic, no
//!   network, good enough for tests and local runs.
//!
//! A service holds one [`Embedder`] for its whole lifetime; install it at
//! startup with [`install_embedder`] and read it with [`shared_embedder`].
//!
//! ```
//! use semantic::{Embedder, SemanticConfig, SemanticEmbedder};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let embedder = SemanticEmbedder::new(SemanticConfig::fast()).unwrap();
//! let texts = vec!["rust async runtime".to_string(), "stock market".to_string()];
//! let vectors = rt.block_on(embedder.embed_batch(&texts)).unwrap();
//! assert_eq!(vectors.len(), 2);
//! assert_eq!(vectors[0].len(), 384);
//! ```

pub mod config;
pub mod error;
pub mod resilience;
mod serde_millis;

mod api;
mod normalize;
mod stub;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

pub use crate::api::{circuit_breaker_stats, is_provider_healthy};
pub use crate::config::SemanticConfig;
pub use crate::error::SemanticError;

use crate::api::embed_batch_via_api;
use crate::stub::make_stub_embedding;

/// Anything that can turn a batch of texts into one vector per text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order, all of the same length.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError>;

    fn model_name(&self) -> &str;
}

/// The configured embedder: remote API or offline stub depending on `mode`.
#[derive(Debug, Clone)]
pub struct SemanticEmbedder {
    cfg: SemanticConfig,
}

impl SemanticEmbedder {
    pub fn new(cfg: SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.cfg
    }
}

#[async_trait]
impl Embedder for SemanticEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        let start = std::time::Instant::now();
        let vectors = match self.cfg.mode.as_str() {
            "fast" => texts
                .iter()
                .map(|t| make_stub_embedding(t, &self.cfg))
                .collect(),
            "api" => embed_batch_via_api(texts, &self.cfg).await?,
            other => {
                return Err(SemanticError::InvalidConfig(format!(
                    "unknown semantic mode '{other}'"
                )))
            }
        };
        tracing::debug!(
            mode = %self.cfg.mode,
            count = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "embedded batch"
        );
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }
}

static SHARED_EMBEDDER: OnceLock<Arc<dyn Embedder>> = OnceLock::new();

/// Install the process-wide embedder. Only the first call wins; later calls
/// hand the rejected embedder back.
pub fn install_embedder(embedder: Arc<dyn Embedder>) -> Result<(), Arc<dyn Embedder>> {
    SHARED_EMBEDDER.set(embedder)
}

/// The embedder installed at startup, if any.
pub fn shared_embedder() -> Option<Arc<dyn Embedder>> {
    SHARED_EMBEDDER.get().cloned()
}
