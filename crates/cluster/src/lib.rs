//! Density clustering of document embeddings.
//!
//! The pipeline is batch-relative and stateless:
//!
//! ```text
//! embeddings -> normalize -> [reduce] -> density cluster -> relabel -> group
//! ```
//!
//! [`cluster_embeddings`] runs everything up to the labels; [`group_documents`]
//! pairs those labels back with the documents. Small or degenerate batches
//! never fail: reducers step aside and the clusterers return an all-noise or
//! all-singleton labeling instead.
//!
//! ```
//! use cluster::{cluster_embeddings, ClusterConfig, NOISE};
//!
//! let embeddings = vec![vec![1.0, 0.0], vec![1.02, 0.01], vec![0.0, 1.0]];
//! let labels = cluster_embeddings(&embeddings, &ClusterConfig::default()).unwrap();
//! assert_eq!(labels, vec![0, 0, NOISE]);
//! ```

pub mod config;
pub mod density;
pub mod distance;
mod error;
mod group;
pub mod normalize;
pub mod reduce;
mod types;

use std::time::Instant;

use tracing::debug;

pub use crate::config::{
    ClusterConfig, ClusterSelection, ClusteringStrategy, DbscanParams, DistanceMetric,
    HdbscanParams, LinearReduction, NeighborhoodReduction, NormalizationMode,
    ReductionStrategy,
};
pub use crate::density::{relabel_by_first_appearance, Dbscan, DensityClusterer, Hdbscan};
pub use crate::error::ClusterError;
pub use crate::group::group_documents;
pub use crate::normalize::standardize;
pub use crate::reduce::{reduce, Reduced, Reducer};
pub use crate::types::{Assignment, ClusterGroup, ClusterLabel, Document, Grouping, NOISE};

/// Label a batch of embeddings.
///
/// Validates `config`, rescales the batch, optionally reduces it, runs the
/// configured density clusterer and renumbers clusters by first appearance.
/// Returns one label per input vector, [`NOISE`] for outliers.
pub fn cluster_embeddings(
    embeddings: &[Vec<f32>],
    config: &ClusterConfig,
) -> Result<Vec<ClusterLabel>, ClusterError> {
    config.validate()?;
    let start = Instant::now();

    let normalized = standardize(embeddings, config.normalization)?;
    let reduced = reduce(normalized, &config.reduction);

    let clusterer = config.clustering.build();
    let raw = clusterer.fit_predict(reduced.data.view())?;
    let labels = relabel_by_first_appearance(&raw);

    debug!(
        algorithm = clusterer.name(),
        points = labels.len(),
        dim = reduced.data.ncols(),
        reduced = reduced.applied,
        clusters = labels.iter().filter(|&&l| l != NOISE).max().map_or(0, |&m| m + 1),
        noise = labels.iter().filter(|&&l| l == NOISE).count(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "clustered batch"
    );

    Ok(labels)
}
