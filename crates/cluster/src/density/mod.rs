//! Density-based clusterers.
//!
//! Both algorithms read a dense pairwise distance matrix, label every point
//! with a cluster number or [`NOISE`], and are pure functions of their input:
//! no randomness, ties broken by point index.

mod dbscan;
mod hdbscan;
mod util;

use ndarray::ArrayView2;

use crate::config::ClusteringStrategy;
use crate::error::ClusterError;
use crate::types::{ClusterLabel, NOISE};

pub use dbscan::Dbscan;
pub use hdbscan::Hdbscan;

/// A clusterer that assigns one label per row, [`NOISE`] for outliers.
pub trait DensityClusterer: Send + Sync {
    fn fit_predict(&self, data: ArrayView2<'_, f32>) -> Result<Vec<ClusterLabel>, ClusterError>;

    /// Short algorithm name for logs and metrics.
    fn name(&self) -> &'static str;
}

impl ClusteringStrategy {
    /// Instantiate the configured clusterer.
    pub fn build(&self) -> Box<dyn DensityClusterer> {
        match self {
            ClusteringStrategy::FixedRadius(p) => Box::new(Dbscan::from_params(p)),
            ClusteringStrategy::VariableDensity(p) => Box::new(Hdbscan::from_params(p)),
        }
    }
}

/// Renumber non-noise labels `0, 1, 2, ...` in order of first appearance.
///
/// Two runs that agree on the partition therefore agree on the numbers too.
/// [`NOISE`] is left untouched.
pub fn relabel_by_first_appearance(labels: &[ClusterLabel]) -> Vec<ClusterLabel> {
    let mut mapping: Vec<(ClusterLabel, ClusterLabel)> = Vec::new();
    let mut next: ClusterLabel = 0;
    labels
        .iter()
        .map(|&label| {
            if label == NOISE {
                return NOISE;
            }
            if let Some(&(_, mapped)) = mapping.iter().find(|(raw, _)| *raw == label) {
                return mapped;
            }
            mapping.push((label, next));
            next += 1;
            next - 1
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relabel_orders_by_first_appearance() {
        let raw = vec![7, 7, NOISE, 3, 7, 12, 3, NOISE];
        assert_eq!(
            relabel_by_first_appearance(&raw),
            vec![0, 0, NOISE, 1, 0, 2, 1, NOISE]
        );
    }

    #[test]
    fn relabel_keeps_all_noise() {
        assert_eq!(relabel_by_first_appearance(&[NOISE, NOISE]), vec![NOISE, NOISE]);
        assert!(relabel_by_first_appearance(&[]).is_empty());
    }

    #[test]
    fn strategy_builds_matching_clusterer() {
        assert_eq!(ClusteringStrategy::default().build().name(), "dbscan");
        let vd = ClusteringStrategy::VariableDensity(Default::default());
        assert_eq!(vd.build().name(), "hdbscan");
    }
}
