//! Bookmark arranger.
//!
//! Takes a batch of saved links (title + summary), embeds them, groups them
//! with density clustering and asks a label generator to name every group.
//!
//! ```text
//! documents -> embed -> normalize -> [reduce] -> cluster -> group -> name (per group)
//! ```
//!
//! The numeric core lives in the `cluster` crate; the embedder and the label
//! generator are collaborators behind the [`Embedder`] and [`LabelGenerator`]
//! traits. [`ClusterPipeline`] wires the three together: clustering failures
//! fail the request, naming failures only mark the affected cluster as
//! unlabeled.

pub mod config;
mod metrics;
mod pipeline;

use thiserror::Error;

pub use cluster::{
    cluster_embeddings, group_documents, Assignment, ClusterConfig, ClusterError, ClusterGroup,
    ClusterLabel, ClusteringStrategy, DbscanParams, Document, Grouping, HdbscanParams,
    NormalizationMode, ReductionStrategy, NOISE,
};
pub use naming::{LabelGenerator, Labeler, NamingConfig, NamingError, TitleGenerator};
pub use semantic::{Embedder, SemanticConfig, SemanticEmbedder, SemanticError};

pub use crate::config::{ArrangeConfig, ConfigLoadError};
pub use crate::metrics::{set_pipeline_metrics, PipelineMetrics};
pub use crate::pipeline::{
    CategoryNames, ClusterPipeline, ClusterResponse, ClusteredItem, PipelineConfig,
};

/// Errors that fail a whole request. Label generation failures never show
/// up here; they are reported per cluster in [`CategoryNames::unlabeled`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// The request itself is unusable (empty, or a document with no text).
    #[error("invalid input: {0}")]
    Input(String),
    /// The embedder failed or broke its contract.
    #[error("embedding failed: {0}")]
    Embedding(#[from] SemanticError),
    /// Bad clustering parameters or inconsistent embeddings.
    #[error("clustering failed: {0}")]
    Cluster(#[from] ClusterError),
    /// The clustering worker panicked or was cancelled.
    #[error("clustering worker failed: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Input(_) => "INVALID_INPUT",
            PipelineError::Embedding(_) => "EMBEDDING_FAILED",
            PipelineError::Cluster(ClusterError::InvalidParameter { .. }) => "INVALID_CLUSTER_CONFIG",
            PipelineError::Cluster(_) => "CLUSTERING_FAILED",
            PipelineError::Worker(_) => "INTERNAL_ERROR",
        }
    }
}
