//! DBSCAN (Ester et al., 1996).
//!
//! A point is *core* when at least `min_samples` points, itself included, lie
//! within `eps` of it. Clusters are the connected components of core points
//! plus the border points they reach; everything else is noise. A point first
//! seen as noise is promoted to border when a later expansion reaches it.

use ndarray::{Array2, ArrayView2};

use super::DensityClusterer;
use crate::config::{DbscanParams, DistanceMetric};
use crate::distance::pairwise;
use crate::error::ClusterError;
use crate::types::{ClusterLabel, NOISE};

const UNCLASSIFIED: ClusterLabel = -2;

/// Fixed-radius density clusterer.
#[derive(Debug, Clone)]
pub struct Dbscan {
    eps: f32,
    min_samples: usize,
    metric: DistanceMetric,
}

impl Dbscan {
    pub fn new(eps: f32, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples,
            metric: DistanceMetric::Euclidean,
        }
    }

    pub fn from_params(params: &DbscanParams) -> Self {
        Self::new(params.eps, params.min_samples).with_metric(params.metric)
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Neighbors of `point` within `eps`, the point itself excluded, ascending.
    fn region_query(&self, dist: &Array2<f32>, point: usize) -> Vec<usize> {
        dist.row(point)
            .iter()
            .enumerate()
            .filter(|&(idx, &d)| idx != point && d <= self.eps)
            .map(|(idx, _)| idx)
            .collect()
    }

    fn is_core(&self, neighbors: &[usize]) -> bool {
        neighbors.len() + 1 >= self.min_samples
    }

    fn expand_cluster(
        &self,
        dist: &Array2<f32>,
        point: usize,
        neighbors: &[usize],
        labels: &mut [ClusterLabel],
        cluster_id: ClusterLabel,
        visited: &mut [bool],
    ) {
        labels[point] = cluster_id;

        let mut to_process: Vec<usize> = neighbors.iter().rev().copied().collect();

        while let Some(neighbor) = to_process.pop() {
            // Noise may be promoted to border, so label before the visited check.
            if labels[neighbor] == UNCLASSIFIED || labels[neighbor] == NOISE {
                labels[neighbor] = cluster_id;
            }

            if visited[neighbor] {
                continue;
            }
            visited[neighbor] = true;

            let next = self.region_query(dist, neighbor);
            if self.is_core(&next) {
                for nn in next.into_iter().rev() {
                    if !visited[nn] {
                        to_process.push(nn);
                    }
                }
            }
        }
    }
}

impl Default for Dbscan {
    fn default() -> Self {
        Self::from_params(&DbscanParams::default())
    }
}

impl DensityClusterer for Dbscan {
    fn fit_predict(&self, data: ArrayView2<'_, f32>) -> Result<Vec<ClusterLabel>, ClusterError> {
        let n = data.nrows();
        if n == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ClusterError::invalid("eps", "must be positive"));
        }
        if self.min_samples == 0 {
            return Err(ClusterError::invalid("min_samples", "must be at least 1"));
        }

        let dist = pairwise(data, self.metric);
        let mut labels = vec![UNCLASSIFIED; n];
        let mut visited = vec![false; n];
        let mut cluster_id: ClusterLabel = 0;

        for point in 0..n {
            if visited[point] {
                continue;
            }
            visited[point] = true;

            let neighbors = self.region_query(&dist, point);
            if !self.is_core(&neighbors) {
                labels[point] = NOISE;
                continue;
            }

            self.expand_cluster(
                &dist,
                point,
                &neighbors,
                &mut labels,
                cluster_id,
                &mut visited,
            );
            cluster_id += 1;
        }

        Ok(labels
            .into_iter()
            .map(|l| if l >= 0 { l } else { NOISE })
            .collect())
    }

    fn name(&self) -> &'static str {
        "dbscan"
    }
}
