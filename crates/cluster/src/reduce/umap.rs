//! Neighborhood-preserving embedding in the manner of UMAP
//! (McInnes, Healy, Melville 2018).
//!
//! A fuzzy k-nearest-neighbor graph of the input is laid out in a small
//! number of dimensions by stochastic gradient descent. The layout is seeded
//! from the principal components and all sampling draws from one seeded
//! generator, so a fixed `seed` reproduces the embedding exactly.
//!
//! Coincident inputs are collapsed to one representative before fitting and
//! share its coordinates in the output. The reducer declines a batch with
//! fewer than `n_neighbors + 1` distinct points.

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use super::pca::principal_scores;
use super::Reducer;
use crate::config::NeighborhoodReduction;
use crate::distance::pairwise;

const NEGATIVE_SAMPLE_RATE: f64 = 5.0;
const GRADIENT_CLIP: f64 = 4.0;
const SIGMA_SEARCH_ITERS: usize = 64;
const SIGMA_TOLERANCE: f64 = 1e-5;
const MIN_K_DIST_SCALE: f64 = 1e-3;
const INIT_EXTENT: f64 = 10.0;
const INIT_NOISE: f64 = 1e-4;
/// Input distance at or below which two points are the same point.
const COINCIDENT_DISTANCE: f32 = 1e-6;

impl Reducer for NeighborhoodReduction {
    fn fit_transform(&self, data: ArrayView2<'_, f32>) -> Option<Array2<f32>> {
        let n = data.nrows();
        if n < self.n_neighbors + 1 {
            return None;
        }

        let dist = pairwise(data, self.metric);
        let (reps, owner) = collapse_coincident(&dist);
        let m = reps.len();
        if m < self.n_neighbors + 1 {
            return None;
        }

        let knn = nearest_neighbors(&dist, &reps, self.n_neighbors);
        let graph = fuzzy_graph(&knn, m, self.n_neighbors);
        let edges = graph_edges(&graph, self.n_epochs);
        let (a, b) = fit_ab(self.spread as f64, self.min_dist as f64);

        let unique = data.select(Axis(0), &reps);
        let mut rng = fastrand::Rng::with_seed(self.seed);
        let mut layout = initial_layout(unique.view(), self.n_components, &mut rng);
        optimize_layout(&mut layout, &edges, a, b, self.n_epochs, &mut rng);

        Some(Array2::from_shape_fn((n, layout.ncols()), |(i, c)| {
            layout[[owner[i], c]] as f32
        }))
    }

    fn name(&self) -> &'static str {
        "umap"
    }
}

/// Representatives (first occurrence, input order) and, per input row, the
/// slot of the representative it coincides with.
fn collapse_coincident(dist: &Array2<f32>) -> (Vec<usize>, Vec<usize>) {
    let n = dist.nrows();
    let mut reps: Vec<usize> = Vec::new();
    let mut owner = Vec::with_capacity(n);
    for i in 0..n {
        match reps.iter().position(|&r| dist[[i, r]] <= COINCIDENT_DISTANCE) {
            Some(slot) => owner.push(slot),
            None => {
                owner.push(reps.len());
                reps.push(i);
            }
        }
    }
    (reps, owner)
}

/// Each representative's `k` nearest representatives (itself excluded) as
/// `(slot, distance)`, nearest first, ties broken by slot.
fn nearest_neighbors(dist: &Array2<f32>, reps: &[usize], k: usize) -> Vec<Vec<(usize, f64)>> {
    let m = reps.len();
    (0..m)
        .into_par_iter()
        .map(|a| {
            let mut row: Vec<(usize, f64)> = (0..m)
                .filter(|&b| b != a)
                .map(|b| (b, dist[[reps[a], reps[b]]] as f64))
                .collect();
            row.sort_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)));
            row.truncate(k);
            row
        })
        .collect()
}

/// Local connectivity `rho` and bandwidth `sigma` for one neighborhood, chosen
/// so the membership strengths sum to `log2(k)`.
fn smooth_knn(neighbors: &[(usize, f64)], k: usize, mean_all: f64) -> (f64, f64) {
    let target = (k as f64).log2();
    let rho = neighbors
        .iter()
        .map(|&(_, d)| d)
        .find(|&d| d > 0.0)
        .unwrap_or(0.0);

    let (mut lo, mut hi, mut mid) = (0.0f64, f64::INFINITY, 1.0f64);
    for _ in 0..SIGMA_SEARCH_ITERS {
        let psum: f64 = neighbors
            .iter()
            .map(|&(_, d)| {
                let gap = d - rho;
                if gap > 0.0 {
                    (-gap / mid).exp()
                } else {
                    1.0
                }
            })
            .sum();

        if (psum - target).abs() < SIGMA_TOLERANCE {
            break;
        }
        if psum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
        }
    }

    let floor = if rho > 0.0 {
        let mean_local = neighbors.iter().map(|&(_, d)| d).sum::<f64>() / neighbors.len().max(1) as f64;
        MIN_K_DIST_SCALE * mean_local
    } else {
        MIN_K_DIST_SCALE * mean_all
    };
    (rho, mid.max(floor))
}

/// Symmetric fuzzy union `a + b - a*b` of the directed membership graph.
fn fuzzy_graph(knn: &[Vec<(usize, f64)>], n: usize, k: usize) -> Array2<f64> {
    let total: f64 = knn.iter().flatten().map(|&(_, d)| d).sum();
    let count = knn.iter().map(Vec::len).sum::<usize>().max(1);
    let mean_all = total / count as f64;

    let mut directed = Array2::<f64>::zeros((n, n));
    for (i, neighbors) in knn.iter().enumerate() {
        let (rho, sigma) = smooth_knn(neighbors, k, mean_all);
        for &(j, d) in neighbors {
            let gap = d - rho;
            directed[[i, j]] = if gap <= 0.0 || sigma <= 0.0 {
                1.0
            } else {
                (-gap / sigma).exp()
            };
        }
    }

    let transposed = directed.t();
    let product = &directed * &transposed;
    &directed + &transposed - product
}

/// Directed edges `(head, tail, weight)` in both directions, dropping weights
/// too small to be sampled within `n_epochs`.
fn graph_edges(graph: &Array2<f64>, n_epochs: usize) -> Vec<(usize, usize, f64)> {
    let max_w = graph.iter().copied().fold(0.0f64, f64::max);
    if max_w <= 0.0 {
        return Vec::new();
    }
    let cutoff = max_w / n_epochs as f64;
    graph
        .indexed_iter()
        .filter(|&((i, j), &w)| i != j && w > 0.0 && w >= cutoff)
        .map(|((i, j), &w)| (i, j, w))
        .collect()
}

/// Fit `1 / (1 + a * x^(2b))` to the target membership curve
/// (1 below `min_dist`, exponential decay with scale `spread` beyond it).
pub(crate) fn fit_ab(spread: f64, min_dist: f64) -> (f64, f64) {
    let samples = 300;
    let xs: Vec<f64> = (0..samples)
        .map(|i| 3.0 * spread * i as f64 / (samples - 1) as f64)
        .collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| {
            if x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / spread).exp()
            }
        })
        .collect();

    let best_for_b = |b: f64| -> (f64, f64) {
        let powers: Vec<f64> = xs.iter().map(|&x| x.powf(2.0 * b)).collect();
        let sse = |ln_a: f64| -> f64 {
            let a = ln_a.exp();
            powers
                .iter()
                .zip(ys.iter())
                .map(|(&p, &y)| {
                    let r = 1.0 / (1.0 + a * p) - y;
                    r * r
                })
                .sum()
        };
        // Golden-section search over ln(a).
        let ratio = (5.0f64.sqrt() - 1.0) / 2.0;
        let (mut lo, mut hi) = (-8.0f64, 8.0f64);
        for _ in 0..80 {
            let m1 = hi - ratio * (hi - lo);
            let m2 = lo + ratio * (hi - lo);
            if sse(m1) < sse(m2) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        let ln_a = (lo + hi) / 2.0;
        (ln_a.exp(), sse(ln_a))
    };

    let search = |from: f64, to: f64, step: f64, best: &mut (f64, f64, f64)| {
        let steps = ((to - from) / step).round() as usize;
        for s in 0..=steps {
            let b = from + step * s as f64;
            if b <= 0.0 {
                continue;
            }
            let (a, err) = best_for_b(b);
            if err < best.2 {
                *best = (a, b, err);
            }
        }
    };

    let mut best = (1.0, 1.0, f64::INFINITY);
    search(0.05, 3.0, 0.01, &mut best);
    let centre = best.1;
    search(centre - 0.01, centre + 0.01, 0.0005, &mut best);
    (best.0, best.1)
}

/// Principal-component layout rescaled to `[0, INIT_EXTENT]` per axis, plus a
/// little seeded jitter so coincident points can separate.
fn initial_layout(data: ArrayView2<'_, f32>, dim: usize, rng: &mut fastrand::Rng) -> Array2<f64> {
    let mut layout = principal_scores(data, dim).mapv(|v| v as f64);
    for mut column in layout.axis_iter_mut(Axis(1)) {
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range > 0.0 {
            column.mapv_inplace(|x| INIT_EXTENT * (x - min) / range);
        }
    }
    layout.mapv_inplace(|x| x + INIT_NOISE * (2.0 * rng.f64() - 1.0));
    layout
}

#[inline]
fn clip(g: f64) -> f64 {
    g.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

fn squared_distance(layout: &Array2<f64>, i: usize, j: usize) -> f64 {
    layout
        .row(i)
        .iter()
        .zip(layout.row(j).iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

fn optimize_layout(
    layout: &mut Array2<f64>,
    edges: &[(usize, usize, f64)],
    a: f64,
    b: f64,
    n_epochs: usize,
    rng: &mut fastrand::Rng,
) {
    if edges.is_empty() {
        return;
    }
    let (n, dim) = layout.dim();
    let max_w = edges.iter().map(|e| e.2).fold(0.0f64, f64::max);

    let epochs_per_sample: Vec<f64> = edges.iter().map(|e| max_w / e.2).collect();
    let epochs_per_negative: Vec<f64> = epochs_per_sample
        .iter()
        .map(|e| e / NEGATIVE_SAMPLE_RATE)
        .collect();
    let mut next_sample = epochs_per_sample.clone();
    let mut next_negative = epochs_per_negative.clone();

    for epoch in 0..n_epochs {
        let now = epoch as f64;
        let alpha = 1.0 - now / n_epochs as f64;

        for (e, &(head, tail, _)) in edges.iter().enumerate() {
            if next_sample[e] > now {
                continue;
            }

            let d2 = squared_distance(layout, head, tail);
            let coeff = if d2 > 0.0 {
                -2.0 * a * b * d2.powf(b - 1.0) / (a * d2.powf(b) + 1.0)
            } else {
                0.0
            };
            for c in 0..dim {
                let grad = clip(coeff * (layout[[head, c]] - layout[[tail, c]]));
                layout[[head, c]] += grad * alpha;
                layout[[tail, c]] -= grad * alpha;
            }
            next_sample[e] += epochs_per_sample[e];

            let n_negative = ((now - next_negative[e]) / epochs_per_negative[e])
                .floor()
                .max(0.0) as usize;
            for _ in 0..n_negative {
                let other = rng.usize(0..n);
                if other == head {
                    continue;
                }
                let d2 = squared_distance(layout, head, other);
                let coeff = if d2 > 0.0 {
                    2.0 * b / ((0.001 + d2) * (a * d2.powf(b) + 1.0))
                } else {
                    0.0
                };
                for c in 0..dim {
                    let grad = if coeff > 0.0 {
                        clip(coeff * (layout[[head, c]] - layout[[other, c]]))
                    } else {
                        GRADIENT_CLIP
                    };
                    layout[[head, c]] += grad * alpha;
                }
            }
            next_negative[e] += n_negative as f64 * epochs_per_negative[e];
        }
    }
}
