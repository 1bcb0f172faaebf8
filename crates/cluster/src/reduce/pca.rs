//! Principal component projection.
//!
//! Eigenpairs come from power iteration with deflation, started from a fixed
//! seed so repeated runs agree bit for bit. When there are fewer rows than
//! dimensions the `n x n` Gram matrix is decomposed instead of the `d x d`
//! covariance. Each component's sign is fixed so its largest-magnitude score
//! is positive.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::Reducer;
use crate::config::LinearReduction;

const MAX_ITERS: usize = 500;
const CONVERGENCE: f64 = 1e-10;
/// Eigenvalues below this fraction of the trace end the decomposition.
const RANK_TOLERANCE: f64 = 1e-10;
const START_SEED: u64 = 0x5eed_1a7e;

impl LinearReduction {
    /// Output dimensionality for an `n x d` batch, or `None` when the
    /// projection does not apply.
    pub fn output_dim(&self, n: usize, d: usize) -> Option<usize> {
        if d <= self.min_input_dim || n < self.target_dim || n == 0 {
            return None;
        }
        let k = self.target_dim.min(n - 1).min(d.saturating_sub(1));
        (k > 0).then_some(k)
    }
}

impl Reducer for LinearReduction {
    fn fit_transform(&self, data: ArrayView2<'_, f32>) -> Option<Array2<f32>> {
        let k = self.output_dim(data.nrows(), data.ncols())?;
        Some(principal_scores(data, k))
    }

    fn name(&self) -> &'static str {
        "pca"
    }
}

/// Scores of the first `k` principal components (`n x k`). Components past
/// the rank of the centered data are zero.
pub(crate) fn principal_scores(data: ArrayView2<'_, f32>, k: usize) -> Array2<f32> {
    let (n, d) = data.dim();
    let x = data.mapv(|v| v as f64);
    let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
    let centered = &x - &mean;
    let denom = (n.max(2) - 1) as f64;

    let mut scores = Array2::<f64>::zeros((n, k));
    if d <= n {
        let cov = centered.t().dot(&centered) / denom;
        for (c, (_, v)) in top_eigenpairs(cov, k).into_iter().enumerate() {
            scores.column_mut(c).assign(&centered.dot(&v));
        }
    } else {
        let gram = centered.dot(&centered.t()) / denom;
        for (c, (lambda, u)) in top_eigenpairs(gram, k).into_iter().enumerate() {
            let singular = (lambda * denom).max(0.0).sqrt();
            scores.column_mut(c).assign(&u.mapv(|x| x * singular));
        }
    }

    for mut column in scores.axis_iter_mut(Axis(1)) {
        let mut pivot = 0.0f64;
        for &x in column.iter() {
            if x.abs() > pivot.abs() {
                pivot = x;
            }
        }
        if pivot < 0.0 {
            column.mapv_inplace(|x| -x);
        }
    }

    scores.mapv(|v| v as f32)
}

/// Largest eigenpairs of a symmetric positive semi-definite matrix, in
/// descending order. Stops early once the remaining spectrum is exhausted.
fn top_eigenpairs(mut a: Array2<f64>, k: usize) -> Vec<(f64, Array1<f64>)> {
    let m = a.nrows();
    let trace: f64 = a.diag().sum();
    if m == 0 || trace <= 0.0 {
        return Vec::new();
    }

    let mut rng = fastrand::Rng::with_seed(START_SEED);
    let mut found: Vec<(f64, Array1<f64>)> = Vec::with_capacity(k);

    for _ in 0..k.min(m) {
        let mut v = Array1::from_shape_fn(m, |_| rng.f64() - 0.5);
        orthogonalize(&mut v, &found);
        if !normalize(&mut v) {
            break;
        }

        for _ in 0..MAX_ITERS {
            let mut w = a.dot(&v);
            orthogonalize(&mut w, &found);
            if !normalize(&mut w) {
                break;
            }
            let delta: f64 = w.iter().zip(v.iter()).map(|(x, y)| (x - y).abs()).sum();
            v = w;
            if delta < CONVERGENCE {
                break;
            }
        }

        let lambda = v.dot(&a.dot(&v));
        if lambda <= RANK_TOLERANCE * trace {
            break;
        }
        for ((i, j), x) in a.indexed_iter_mut() {
            *x -= lambda * v[i] * v[j];
        }
        found.push((lambda, v));
    }

    found
}

fn orthogonalize(v: &mut Array1<f64>, basis: &[(f64, Array1<f64>)]) {
    for (_, b) in basis {
        let proj = v.dot(b);
        v.scaled_add(-proj, b);
    }
}

fn normalize(v: &mut Array1<f64>) -> bool {
    let norm = v.dot(v).sqrt();
    if norm <= f64::MIN_POSITIVE || !norm.is_finite() {
        return false;
    }
    v.mapv_inplace(|x| x / norm);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points `t * u` for a fixed 60-d direction `u`.
    fn line(ts: &[f32]) -> Array2<f32> {
        let d = 60;
        let norm = ((1..=d).map(|j| (j * j) as f32).sum::<f32>()).sqrt();
        Array2::from_shape_fn((ts.len(), d), |(i, j)| ts[i] * (j + 1) as f32 / norm)
    }

    fn params(target_dim: usize, min_input_dim: usize) -> LinearReduction {
        LinearReduction {
            target_dim,
            min_input_dim,
        }
    }

    #[test]
    fn skipped_when_dimension_is_already_small() {
        let data = Array2::<f32>::zeros((100, 50));
        assert!(params(50, 50).fit_transform(data.view()).is_none());
    }

    #[test]
    fn skipped_when_batch_is_smaller_than_target() {
        let data = Array2::<f32>::zeros((10, 384));
        assert!(params(50, 50).fit_transform(data.view()).is_none());
    }

    #[test]
    fn output_dimension_is_clamped_to_rank_bound() {
        assert_eq!(params(8, 50).output_dim(10, 60), Some(8));
        assert_eq!(params(8, 50).output_dim(8, 60), Some(7));
        assert_eq!(params(1, 0).output_dim(1, 5), None);
    }

    #[test]
    fn rank_one_data_projects_onto_one_axis() {
        let ts = [0.0f32, 1.0, 2.0, 3.0, 10.0];
        let out = params(3, 50).fit_transform(line(&ts).view()).unwrap();
        assert_eq!(out.dim(), (5, 3));

        let mean = ts.iter().sum::<f32>() / ts.len() as f32;
        for (i, &t) in ts.iter().enumerate() {
            assert!((out[[i, 0]] - (t - mean)).abs() < 1e-3, "row {i}: {}", out[[i, 0]]);
            assert!(out[[i, 1]].abs() < 1e-3);
            assert!(out[[i, 2]].abs() < 1e-3);
        }
    }

    #[test]
    fn covariance_path_orders_components_by_variance() {
        let mut rng = fastrand::Rng::with_seed(7);
        let data = Array2::from_shape_fn((80, 60), |(_, j)| {
            let scale = if j == 3 { 10.0 } else { 1.0 };
            (rng.f32() - 0.5) * scale
        });
        let out = params(50, 50).fit_transform(data.view()).unwrap();
        assert_eq!(out.dim(), (80, 50));
        assert!(out.iter().all(|x| x.is_finite()));

        let var = |c: usize| out.column(c).iter().map(|x| x * x).sum::<f32>();
        assert!(var(0) > var(1));
    }

    #[test]
    fn identical_rows_project_to_zero() {
        let data = Array2::<f32>::ones((6, 64));
        let out = params(4, 50).fit_transform(data.view()).unwrap();
        assert!(out.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn repeated_runs_agree() {
        let ts = [0.5f32, -1.0, 2.0, 7.0, 3.0, 3.5];
        let a = params(4, 50).fit_transform(line(&ts).view()).unwrap();
        let b = params(4, 50).fit_transform(line(&ts).view()).unwrap();
        assert_eq!(a, b);
    }
}
