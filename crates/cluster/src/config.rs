//! Clustering configuration.
//!
//! One explicit structure enumerates every tunable of the pipeline. Strategy
//! choices are tagged variants carrying their own parameters, so a YAML or
//! JSON document selects an algorithm by `strategy:` and only the fields that
//! algorithm understands are accepted.
//!
//! ```yaml
//! normalization: standard
//! reduction:
//!   strategy: linear
//!   target_dim: 50
//!   min_input_dim: 50
//! clustering:
//!   strategy: fixed_radius
//!   eps: 0.5
//!   min_samples: 2
//! sample_cap: 5
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Distance measure used by reducers and clusterers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    /// `1 - cos(a, b)`.
    Cosine,
}

/// Per-batch rescaling applied before anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Zero mean and unit population variance per dimension.
    #[default]
    Standard,
    /// Unit L2 length per vector.
    L2,
    /// Pass vectors through untouched.
    None,
}

/// Variance-preserving linear projection (PCA).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearReduction {
    /// Requested output dimensionality.
    #[serde(default = "default_target_dim")]
    pub target_dim: usize,
    /// Reduction only runs when the native dimensionality exceeds this.
    #[serde(default = "default_min_input_dim")]
    pub min_input_dim: usize,
}

impl Default for LinearReduction {
    fn default() -> Self {
        Self {
            target_dim: default_target_dim(),
            min_input_dim: default_min_input_dim(),
        }
    }
}

/// Neighborhood-preserving non-linear projection (UMAP-style).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodReduction {
    #[serde(default = "default_n_components")]
    pub n_components: usize,
    /// Size of each point's local neighborhood (self excluded).
    #[serde(default = "default_n_neighbors")]
    pub n_neighbors: usize,
    /// Minimum spacing of points in the embedding.
    #[serde(default)]
    pub min_dist: f32,
    #[serde(default = "default_spread")]
    pub spread: f32,
    #[serde(default = "default_cosine")]
    pub metric: DistanceMetric,
    #[serde(default = "default_n_epochs")]
    pub n_epochs: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for NeighborhoodReduction {
    fn default() -> Self {
        Self {
            n_components: default_n_components(),
            n_neighbors: default_n_neighbors(),
            min_dist: 0.0,
            spread: default_spread(),
            metric: DistanceMetric::Cosine,
            n_epochs: default_n_epochs(),
            seed: default_seed(),
        }
    }
}

/// Optional dimensionality-reduction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReductionStrategy {
    #[default]
    None,
    Linear(LinearReduction),
    Neighborhood(NeighborhoodReduction),
}

/// Fixed-radius density clustering (DBSCAN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbscanParams {
    #[serde(default = "default_eps")]
    pub eps: f32,
    /// Neighbors within `eps` (the point itself included) for a core point.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            min_samples: default_min_samples(),
            metric: DistanceMetric::Euclidean,
        }
    }
}

/// How clusters are picked from the HDBSCAN condensed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSelection {
    /// Excess of mass: the most persistent clusters.
    #[default]
    Eom,
    /// Leaves of the condensed tree: finer-grained clusters.
    Leaf,
}

/// Variable-density clustering (HDBSCAN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdbscanParams {
    /// Smallest group reported as a cluster; `1` allows singleton clusters.
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    /// Neighborhood size for core distances; defaults to `min_cluster_size`.
    #[serde(default)]
    pub min_samples: Option<usize>,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub selection: ClusterSelection,
    /// Let the whole batch be reported as one cluster.
    #[serde(default)]
    pub allow_single_cluster: bool,
}

impl Default for HdbscanParams {
    fn default() -> Self {
        Self {
            min_cluster_size: default_min_cluster_size(),
            min_samples: None,
            metric: DistanceMetric::Euclidean,
            selection: ClusterSelection::Eom,
            allow_single_cluster: false,
        }
    }
}

impl HdbscanParams {
    pub fn effective_min_samples(&self) -> usize {
        self.min_samples.unwrap_or(self.min_cluster_size)
    }
}

/// Density clustering algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ClusteringStrategy {
    FixedRadius(DbscanParams),
    VariableDensity(HdbscanParams),
}

impl Default for ClusteringStrategy {
    fn default() -> Self {
        ClusteringStrategy::FixedRadius(DbscanParams::default())
    }
}

/// Everything the core needs to turn a batch of embeddings into labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub normalization: NormalizationMode,
    #[serde(default)]
    pub reduction: ReductionStrategy,
    #[serde(default)]
    pub clustering: ClusteringStrategy,
    /// Snippets per cluster forwarded to the label generator.
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            normalization: NormalizationMode::Standard,
            reduction: ReductionStrategy::None,
            clustering: ClusteringStrategy::default(),
            sample_cap: default_sample_cap(),
        }
    }
}

impl ClusterConfig {
    pub fn with_normalization(mut self, mode: NormalizationMode) -> Self {
        self.normalization = mode;
        self
    }

    pub fn with_reduction(mut self, reduction: ReductionStrategy) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn with_clustering(mut self, clustering: ClusteringStrategy) -> Self {
        self.clustering = clustering;
        self
    }

    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap;
        self
    }

    /// Range-check every parameter. Batch-size dependent conditions are not
    /// errors and are handled by the stages themselves.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.sample_cap == 0 {
            return Err(ClusterError::invalid("sample_cap", "must be at least 1"));
        }

        match &self.reduction {
            ReductionStrategy::None => {}
            ReductionStrategy::Linear(p) => {
                if p.target_dim == 0 {
                    return Err(ClusterError::invalid("target_dim", "must be at least 1"));
                }
            }
            ReductionStrategy::Neighborhood(p) => {
                if p.n_components == 0 {
                    return Err(ClusterError::invalid("n_components", "must be at least 1"));
                }
                if p.n_neighbors < 2 {
                    return Err(ClusterError::invalid("n_neighbors", "must be at least 2"));
                }
                if !p.spread.is_finite() || p.spread <= 0.0 {
                    return Err(ClusterError::invalid("spread", "must be positive"));
                }
                if !p.min_dist.is_finite() || p.min_dist < 0.0 {
                    return Err(ClusterError::invalid("min_dist", "must be non-negative"));
                }
                if p.min_dist > p.spread {
                    return Err(ClusterError::invalid("min_dist", "must not exceed spread"));
                }
                if p.n_epochs == 0 {
                    return Err(ClusterError::invalid("n_epochs", "must be at least 1"));
                }
            }
        }

        match &self.clustering {
            ClusteringStrategy::FixedRadius(p) => {
                if !p.eps.is_finite() || p.eps <= 0.0 {
                    return Err(ClusterError::invalid("eps", "must be positive"));
                }
                if p.min_samples == 0 {
                    return Err(ClusterError::invalid("min_samples", "must be at least 1"));
                }
            }
            ClusteringStrategy::VariableDensity(p) => {
                if p.min_cluster_size == 0 {
                    return Err(ClusterError::invalid(
                        "min_cluster_size",
                        "must be at least 1",
                    ));
                }
                if p.effective_min_samples() == 0 {
                    return Err(ClusterError::invalid("min_samples", "must be at least 1"));
                }
            }
        }

        Ok(())
    }
}

fn default_target_dim() -> usize {
    50
}

fn default_min_input_dim() -> usize {
    50
}

fn default_n_components() -> usize {
    5
}

fn default_n_neighbors() -> usize {
    15
}

fn default_spread() -> f32 {
    1.0
}

fn default_cosine() -> DistanceMetric {
    DistanceMetric::Cosine
}

fn default_n_epochs() -> usize {
    200
}

fn default_seed() -> u64 {
    42
}

fn default_eps() -> f32 {
    0.5
}

fn default_min_samples() -> usize {
    2
}

fn default_min_cluster_size() -> usize {
    2
}

fn default_sample_cap() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_fixed_radius_service() {
        let cfg = ClusterConfig::default();
        assert_eq!(cfg.normalization, NormalizationMode::Standard);
        assert_eq!(cfg.reduction, ReductionStrategy::None);
        assert_eq!(cfg.sample_cap, 5);
        match cfg.clustering {
            ClusteringStrategy::FixedRadius(p) => {
                assert_eq!(p.eps, 0.5);
                assert_eq!(p.min_samples, 2);
                assert_eq!(p.metric, DistanceMetric::Euclidean);
            }
            other => panic!("unexpected default strategy: {other:?}"),
        }
        assert!(ClusterConfig::default().validate().is_ok());
    }

    #[test]
    fn tagged_strategies_deserialize() {
        let json = r#"{
            "normalization": "l2",
            "reduction": { "strategy": "neighborhood", "n_neighbors": 4 },
            "clustering": { "strategy": "variable_density", "min_cluster_size": 1 }
        }"#;
        let cfg: ClusterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.normalization, NormalizationMode::L2);
        match &cfg.reduction {
            ReductionStrategy::Neighborhood(p) => {
                assert_eq!(p.n_neighbors, 4);
                assert_eq!(p.n_components, 5);
                assert_eq!(p.metric, DistanceMetric::Cosine);
            }
            other => panic!("unexpected reduction: {other:?}"),
        }
        match &cfg.clustering {
            ClusteringStrategy::VariableDensity(p) => {
                assert_eq!(p.min_cluster_size, 1);
                assert_eq!(p.effective_min_samples(), 1);
            }
            other => panic!("unexpected clustering: {other:?}"),
        }
        assert_eq!(cfg.sample_cap, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let json = r#"{ "clustering": { "strategy": "kmeans", "k": 3 } }"#;
        assert!(serde_json::from_str::<ClusterConfig>(json).is_err());
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let bad_eps = ClusterConfig::default().with_clustering(ClusteringStrategy::FixedRadius(
            DbscanParams {
                eps: 0.0,
                ..Default::default()
            },
        ));
        assert!(matches!(
            bad_eps.validate(),
            Err(ClusterError::InvalidParameter { name: "eps", .. })
        ));

        let bad_min_samples = ClusterConfig::default().with_clustering(
            ClusteringStrategy::FixedRadius(DbscanParams {
                min_samples: 0,
                ..Default::default()
            }),
        );
        assert!(bad_min_samples.validate().is_err());

        let bad_mcs = ClusterConfig::default().with_clustering(
            ClusteringStrategy::VariableDensity(HdbscanParams {
                min_cluster_size: 0,
                ..Default::default()
            }),
        );
        assert!(bad_mcs.validate().is_err());

        let bad_neighbors = ClusterConfig::default().with_reduction(
            ReductionStrategy::Neighborhood(NeighborhoodReduction {
                n_neighbors: 1,
                ..Default::default()
            }),
        );
        assert!(bad_neighbors.validate().is_err());

        let bad_min_dist = ClusterConfig::default().with_reduction(
            ReductionStrategy::Neighborhood(NeighborhoodReduction {
                min_dist: 2.0,
                spread: 1.0,
                ..Default::default()
            }),
        );
        assert!(bad_min_dist.validate().is_err());

        let bad_target = ClusterConfig::default().with_reduction(ReductionStrategy::Linear(
            LinearReduction {
                target_dim: 0,
                ..Default::default()
            },
        ));
        assert!(bad_target.validate().is_err());

        assert!(ClusterConfig::default().with_sample_cap(0).validate().is_err());
    }

    #[test]
    fn singleton_clusters_are_a_valid_configuration() {
        let cfg = ClusterConfig::default().with_clustering(ClusteringStrategy::VariableDensity(
            HdbscanParams {
                min_cluster_size: 1,
                min_samples: Some(1),
                ..Default::default()
            },
        ));
        assert!(cfg.validate().is_ok());
    }
}
