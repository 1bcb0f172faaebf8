//! YAML configuration for the whole pipeline.
//!
//! One file selects the embedder, the clustering parameters and the label
//! generator. It is parsed and validated once at startup.
//!
//! ```yaml
//! version: "1.0"
//! name: bookmarks
//!
//! semantic:
//!   mode: api
//!   api_provider: hf
//!   api_url: https://api-inference.huggingface.co/pipeline/feature-extraction/sentence-transformers/all-MiniLM-L6-v2
//!   api_auth_header: "Bearer hf_xxx"
//!
//! clustering:
//!   normalization: standard
//!   reduction:
//!     strategy: none
//!   clustering:
//!     strategy: fixed_radius
//!     eps: 0.5
//!     min_samples: 2
//!   sample_cap: 5
//!
//! naming:
//!   mode: chat
//!   model: gpt-3.5-turbo
//!   temperature: 0.7
//!   max_tokens: 30
//!
//! label_timeout_secs: 20
//! max_concurrent_labels: 8
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cluster::ClusterConfig;
use naming::{Labeler, NamingConfig};
use semantic::{SemanticConfig, SemanticEmbedder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::{ClusterPipeline, PipelineConfig};

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_label_timeout_secs() -> u64 {
    20
}

fn default_max_concurrent_labels() -> usize {
    8
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangeConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub clustering: ClusterConfig,

    #[serde(default)]
    pub naming: NamingConfig,

    /// Per-cluster naming deadline.
    #[serde(default = "default_label_timeout_secs")]
    pub label_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_labels")]
    pub max_concurrent_labels: usize,
}

impl Default for ArrangeConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            semantic: SemanticConfig::default(),
            clustering: ClusterConfig::default(),
            naming: NamingConfig::default(),
            label_timeout_secs: default_label_timeout_secs(),
            max_concurrent_labels: default_max_concurrent_labels(),
        }
    }
}

impl ArrangeConfig {
    /// Fully offline: stub embedder and stub labeler.
    pub fn offline() -> Self {
        Self {
            semantic: SemanticConfig::fast(),
            naming: NamingConfig::stub(),
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: ArrangeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        self.semantic
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("semantic: {e}")))?;
        self.clustering
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("clustering: {e}")))?;
        self.naming
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("naming: {e}")))?;

        if self.label_timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "label_timeout_secs must be >= 1".to_string(),
            ));
        }
        if self.max_concurrent_labels == 0 {
            return Err(ConfigLoadError::Validation(
                "max_concurrent_labels must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            cluster: self.clustering.clone(),
            label_timeout: Duration::from_secs(self.label_timeout_secs),
            max_concurrent_labels: self.max_concurrent_labels,
        }
    }

    /// Construct the configured embedder and labeler.
    pub fn collaborators(&self) -> Result<(Arc<SemanticEmbedder>, Arc<Labeler>), ConfigLoadError> {
        let embedder = SemanticEmbedder::new(self.semantic.clone())
            .map_err(|e| ConfigLoadError::Validation(format!("semantic: {e}")))?;
        let labeler = Labeler::from_config(&self.naming)
            .map_err(|e| ConfigLoadError::Validation(format!("naming: {e}")))?;
        Ok((Arc::new(embedder), Arc::new(labeler)))
    }

    /// Build a ready pipeline from this configuration.
    pub fn build_pipeline(&self) -> Result<ClusterPipeline, ConfigLoadError> {
        self.validate()?;
        let (embedder, labeler) = self.collaborators()?;
        ClusterPipeline::new(embedder, labeler, self.pipeline_config())
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))
    }
}
