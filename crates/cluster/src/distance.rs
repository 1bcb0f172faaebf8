use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::config::DistanceMetric;

#[inline]
pub fn euclidean(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// `1 - cos(a, b)`, in `[0, 2]`.
///
/// Two zero vectors are treated as identical (distance 0); a zero vector
/// against anything else is orthogonal (distance 1).
#[inline]
pub fn cosine(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        na += x as f64 * x as f64;
        nb += y as f64 * y as f64;
    }
    if na == 0.0 && nb == 0.0 {
        return 0.0;
    }
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    let sim = (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0);
    (1.0 - sim) as f32
}

impl DistanceMetric {
    #[inline]
    pub fn distance(self, a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
        match self {
            DistanceMetric::Euclidean => euclidean(a, b),
            DistanceMetric::Cosine => cosine(a, b),
        }
    }
}

/// Dense symmetric `n x n` distance matrix. Rows are computed in parallel;
/// the result does not depend on scheduling.
pub fn pairwise(data: ArrayView2<'_, f32>, metric: DistanceMetric) -> Array2<f32> {
    let n = data.nrows();
    let rows: Vec<Vec<f32>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let a = data.row(i);
            (0..n)
                .map(|j| if i == j { 0.0 } else { metric.distance(a, data.row(j)) })
                .collect()
        })
        .collect();

    let mut out = Array2::<f32>::zeros((n, n));
    for (i, row) in rows.into_iter().enumerate() {
        for (j, d) in row.into_iter().enumerate() {
            out[[i, j]] = d;
        }
    }
    // Symmetrize so floating-point order effects never make d(i,j) != d(j,i).
    for i in 0..n {
        for j in (i + 1)..n {
            let d = out[[i, j]];
            out[[j, i]] = d;
        }
    }
    out
}
