//! Optional dimensionality reduction between normalization and clustering.
//!
//! A reducer may decline a batch (too few points, or already few dimensions);
//! the data then flows on unchanged.

mod pca;
mod umap;

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::config::ReductionStrategy;

/// Fit on a batch and return its projection, or `None` when the batch is
/// outside what the reducer can handle.
pub trait Reducer {
    fn fit_transform(&self, data: ArrayView2<'_, f32>) -> Option<Array2<f32>>;

    fn name(&self) -> &'static str;
}

/// Result of the reduction stage.
#[derive(Debug, Clone)]
pub struct Reduced {
    pub data: Array2<f32>,
    /// Whether a projection actually ran.
    pub applied: bool,
}

/// Run the configured reducer, passing the batch through when it declines.
pub fn reduce(data: Array2<f32>, strategy: &ReductionStrategy) -> Reduced {
    let reducer: &dyn Reducer = match strategy {
        ReductionStrategy::None => {
            return Reduced {
                data,
                applied: false,
            }
        }
        ReductionStrategy::Linear(p) => p,
        ReductionStrategy::Neighborhood(p) => p,
    };

    let (n, d) = data.dim();
    match reducer.fit_transform(data.view()) {
        Some(projected) => {
            debug!(
                reducer = reducer.name(),
                rows = n,
                from_dim = d,
                to_dim = projected.ncols(),
                "reduced batch"
            );
            Reduced {
                data: projected,
                applied: true,
            }
        }
        None => {
            debug!(reducer = reducer.name(), rows = n, dim = d, "reduction skipped");
            Reduced {
                data,
                applied: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LinearReduction, NeighborhoodReduction};

    #[test]
    fn none_passes_through() {
        let data = Array2::<f32>::ones((3, 4));
        let out = reduce(data.clone(), &ReductionStrategy::None);
        assert!(!out.applied);
        assert_eq!(out.data, data);
    }

    #[test]
    fn small_batches_skip_reduction() {
        let data = Array2::<f32>::ones((4, 384));
        let out = reduce(
            data.clone(),
            &ReductionStrategy::Linear(LinearReduction::default()),
        );
        assert!(!out.applied);
        assert_eq!(out.data, data);

        let out = reduce(
            data.clone(),
            &ReductionStrategy::Neighborhood(NeighborhoodReduction::default()),
        );
        assert!(!out.applied);
        assert_eq!(out.data.dim(), (4, 384));
    }

    #[test]
    fn linear_reduction_changes_width() {
        let mut rng = fastrand::Rng::with_seed(3);
        let data = Array2::from_shape_fn((60, 128), |_| rng.f32());
        let out = reduce(
            data,
            &ReductionStrategy::Linear(LinearReduction {
                target_dim: 10,
                min_input_dim: 50,
            }),
        );
        assert!(out.applied);
        assert_eq!(out.data.dim(), (60, 10));
    }
}
