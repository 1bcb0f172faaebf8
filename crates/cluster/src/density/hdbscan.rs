//! HDBSCAN (Campello, Moulavi, Sander 2013).
//!
//! 1. Core distance: distance to the `min_samples`-th nearest point, the point
//!    itself counted first (so `min_samples = 1` gives core distance 0).
//! 2. Mutual reachability: `max(core[i], core[j], d(i, j))`.
//! 3. Minimum spanning tree over mutual reachability (Prim, index tie-break),
//!    then a single-linkage dendrogram from its edges in ascending order.
//! 4. Condensed tree: walking the dendrogram from the root, a split where both
//!    sides have at least `min_cluster_size` points gives birth to two child
//!    clusters; a side below that size has its points fall out of the parent.
//! 5. Selection by excess of mass (or leaves), then labeling.
//!
//! The root cluster is only a candidate when the batch holds at least
//! `min_cluster_size` points and either `allow_single_cluster` is set or no
//! child cluster ever split off it. When the root is selected, only points that
//! persist to its densest level are labeled; the rest are noise. With
//! `min_cluster_size = 1` a lone point on either side of a split becomes a
//! zero-stability cluster of its own, so nothing is reported as noise.
//! Coincident points never split: a zero-distance merge keeps all of its
//! points in the enclosing cluster.

use std::collections::VecDeque;

use ndarray::{Array2, ArrayView2};

use super::util::{prim_mst, UnionFind};
use super::{relabel_by_first_appearance, DensityClusterer};
use crate::config::{ClusterSelection, DistanceMetric, HdbscanParams};
use crate::distance::pairwise;
use crate::error::ClusterError;
use crate::types::{ClusterLabel, NOISE};

/// Distances below this are treated as this, keeping every lambda finite.
const MIN_DISTANCE: f64 = 1e-12;

/// Variable-density clusterer.
#[derive(Debug, Clone)]
pub struct Hdbscan {
    min_cluster_size: usize,
    min_samples: usize,
    metric: DistanceMetric,
    selection: ClusterSelection,
    allow_single_cluster: bool,
}

impl Hdbscan {
    /// `min_samples` defaults to `min_cluster_size`.
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size,
            min_samples: min_cluster_size,
            metric: DistanceMetric::Euclidean,
            selection: ClusterSelection::Eom,
            allow_single_cluster: false,
        }
    }

    pub fn from_params(params: &HdbscanParams) -> Self {
        Self {
            min_cluster_size: params.min_cluster_size,
            min_samples: params.effective_min_samples(),
            metric: params.metric,
            selection: params.selection,
            allow_single_cluster: params.allow_single_cluster,
        }
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_selection(mut self, selection: ClusterSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }
}

impl Default for Hdbscan {
    fn default() -> Self {
        Self::from_params(&HdbscanParams::default())
    }
}

impl DensityClusterer for Hdbscan {
    fn fit_predict(&self, data: ArrayView2<'_, f32>) -> Result<Vec<ClusterLabel>, ClusterError> {
        let n = data.nrows();
        if n == 0 {
            return Err(ClusterError::EmptyInput);
        }
        if self.min_cluster_size == 0 {
            return Err(ClusterError::invalid("min_cluster_size", "must be at least 1"));
        }
        if self.min_samples == 0 {
            return Err(ClusterError::invalid("min_samples", "must be at least 1"));
        }

        if n == 1 {
            let label = if self.min_cluster_size == 1 { 0 } else { NOISE };
            return Ok(vec![label]);
        }

        let dist = pairwise(data, self.metric);
        let core = core_distances(&dist, self.min_samples);
        let mst = prim_mst(n, |i, j| {
            mutual_reachability(dist[[i, j]], core[i], core[j])
        });
        let merges = single_linkage(mst, n);
        let tree = condense(&merges, n, self.min_cluster_size);
        let selected = select_clusters(
            &tree,
            self.selection,
            self.min_cluster_size,
            self.allow_single_cluster,
        );
        let labels = label_points(&tree, &selected);

        Ok(relabel_by_first_appearance(&labels))
    }

    fn name(&self) -> &'static str {
        "hdbscan"
    }
}

fn core_distances(dist: &Array2<f32>, min_samples: usize) -> Vec<f32> {
    let n = dist.nrows();
    let k = min_samples.min(n);
    (0..n)
        .map(|i| {
            let mut row = dist.row(i).to_vec();
            let (_, kth, _) = row.select_nth_unstable_by(k - 1, |a, b| a.total_cmp(b));
            *kth
        })
        .collect()
}

#[inline]
fn mutual_reachability(dist: f32, core_i: f32, core_j: f32) -> f32 {
    dist.max(core_i).max(core_j)
}

#[inline]
fn lambda_of(distance: f32) -> f64 {
    1.0 / (distance as f64).max(MIN_DISTANCE)
}

/// One internal node of the single-linkage dendrogram. Node ids below `n`
/// are points; merge `t` is node `n + t`.
#[derive(Debug, Clone)]
struct Merge {
    left: usize,
    right: usize,
    distance: f32,
    size: usize,
}

fn single_linkage(mut edges: Vec<(usize, usize, f32)>, n: usize) -> Vec<Merge> {
    edges.sort_by(|a, b| {
        a.2.total_cmp(&b.2)
            .then_with(|| (a.0.min(a.1), a.0.max(a.1)).cmp(&(b.0.min(b.1), b.0.max(b.1))))
    });

    let mut uf = UnionFind::new(n);
    let mut node_of: Vec<usize> = (0..n).collect();
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    for (u, v, distance) in edges {
        let (ru, rv) = (uf.find(u), uf.find(v));
        if ru == rv {
            continue;
        }
        let size = uf.size[ru] + uf.size[rv];
        let (left, right) = (node_of[ru], node_of[rv]);
        let root = uf.union_roots(ru, rv);
        node_of[root] = n + merges.len();
        merges.push(Merge {
            left,
            right,
            distance,
            size,
        });
    }
    merges
}

/// A row of the condensed tree: `child` (a point below `n_points`, or a
/// cluster id at or above it) leaves `parent` at density `lambda`.
#[derive(Debug, Clone, PartialEq)]
struct CondensedRow {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

#[derive(Debug, Clone)]
struct CondensedTree {
    rows: Vec<CondensedRow>,
    n_points: usize,
    /// Cluster ids are `n_points..n_points + n_clusters`; the root is `n_points`.
    n_clusters: usize,
}

fn condense(merges: &[Merge], n: usize, min_cluster_size: usize) -> CondensedTree {
    let root = n + merges.len() - 1;
    let node_size = |node: usize| if node < n { 1 } else { merges[node - n].size };

    let mut relabel = vec![0usize; root + 1];
    let mut ignore = vec![false; root + 1];
    let mut rows = Vec::with_capacity(2 * n);
    let mut next_label = n + 1;
    relabel[root] = n;

    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        if node < n || ignore[node] {
            continue;
        }
        let merge = &merges[node - n];
        let parent = relabel[node];
        let lambda = lambda_of(merge.distance);
        let sides = [merge.left, merge.right];
        let keeps = sides.map(|side| node_size(side) >= min_cluster_size);
        // Everything below a zero-distance merge coincides; nothing splits there.
        let coincident = merge.distance as f64 <= MIN_DISTANCE;

        match keeps {
            [true, true] if !coincident => {
                for side in sides {
                    relabel[side] = next_label;
                    next_label += 1;
                    rows.push(CondensedRow {
                        parent,
                        child: relabel[side],
                        lambda,
                        size: node_size(side),
                    });
                    if side < n {
                        // Singleton cluster: its point leaves at birth.
                        rows.push(CondensedRow {
                            parent: relabel[side],
                            child: side,
                            lambda,
                            size: 1,
                        });
                    }
                }
            }
            [true, true] | [false, false] => {
                for side in sides {
                    for point in drain_subtree(merges, n, side, &mut ignore) {
                        rows.push(point_row(parent, point, lambda));
                    }
                }
            }
            [left_keeps, _] => {
                let (kept, dropped) = if left_keeps {
                    (merge.left, merge.right)
                } else {
                    (merge.right, merge.left)
                };
                relabel[kept] = parent;
                if kept < n {
                    rows.push(point_row(parent, kept, lambda));
                }
                for point in drain_subtree(merges, n, dropped, &mut ignore) {
                    rows.push(point_row(parent, point, lambda));
                }
            }
        }

        queue.push_back(merge.left);
        queue.push_back(merge.right);
    }

    CondensedTree {
        rows,
        n_points: n,
        n_clusters: next_label - n,
    }
}

fn point_row(parent: usize, point: usize, lambda: f64) -> CondensedRow {
    CondensedRow {
        parent,
        child: point,
        lambda,
        size: 1,
    }
}

/// Points under `node`, marking every internal node on the way as consumed.
fn drain_subtree(merges: &[Merge], n: usize, node: usize, ignore: &mut [bool]) -> Vec<usize> {
    let mut points = Vec::new();
    let mut stack = vec![node];
    while let Some(x) = stack.pop() {
        if x < n {
            points.push(x);
            continue;
        }
        ignore[x] = true;
        let merge = &merges[x - n];
        stack.push(merge.right);
        stack.push(merge.left);
    }
    points
}

/// Returns, per cluster (offset from the root), whether it was selected.
fn select_clusters(
    tree: &CondensedTree,
    selection: ClusterSelection,
    min_cluster_size: usize,
    allow_single_cluster: bool,
) -> Vec<bool> {
    let n = tree.n_points;
    let k = tree.n_clusters;

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut birth = vec![0.0f64; k];
    for row in tree.rows.iter().filter(|r| r.child >= n) {
        children[row.parent - n].push(row.child - n);
        birth[row.child - n] = row.lambda;
    }

    let mut stability = vec![0.0f64; k];
    for row in &tree.rows {
        let c = row.parent - n;
        stability[c] += (row.lambda - birth[c]) * row.size as f64;
    }

    let root_selectable =
        n >= min_cluster_size && (allow_single_cluster || children[0].is_empty());
    let mut selected = vec![false; k];

    match selection {
        ClusterSelection::Eom => {
            let mut subtree = vec![0.0f64; k];
            // Children always carry larger ids than their parent.
            for c in (0..k).rev() {
                let child_sum: f64 = children[c].iter().map(|&ch| subtree[ch]).sum();
                if c == 0 && !root_selectable {
                    continue;
                }
                if stability[c] >= child_sum {
                    selected[c] = true;
                    deselect_descendants(&children, c, &mut selected);
                    subtree[c] = stability[c];
                } else {
                    subtree[c] = child_sum;
                }
            }
        }
        ClusterSelection::Leaf => {
            for c in 0..k {
                if children[c].is_empty() && (c != 0 || root_selectable) {
                    selected[c] = true;
                }
            }
        }
    }

    selected
}

fn deselect_descendants(children: &[Vec<usize>], node: usize, selected: &mut [bool]) {
    let mut stack: Vec<usize> = children[node].clone();
    while let Some(c) = stack.pop() {
        selected[c] = false;
        stack.extend_from_slice(&children[c]);
    }
}

fn label_points(tree: &CondensedTree, selected: &[bool]) -> Vec<ClusterLabel> {
    let n = tree.n_points;

    let mut parent_of: Vec<Option<usize>> = vec![None; tree.n_clusters];
    for row in tree.rows.iter().filter(|r| r.child >= n) {
        parent_of[row.child - n] = Some(row.parent - n);
    }

    let root_max_lambda = tree
        .rows
        .iter()
        .filter(|r| r.parent == n)
        .map(|r| r.lambda)
        .fold(0.0f64, f64::max);

    let mut labels = vec![NOISE; n];
    for row in tree.rows.iter().filter(|r| r.child < n) {
        let mut cluster = Some(row.parent - n);
        while let Some(c) = cluster {
            if selected[c] {
                break;
            }
            cluster = parent_of[c];
        }

        labels[row.child] = match cluster {
            Some(0) if row.lambda < root_max_lambda => NOISE,
            Some(c) => c as ClusterLabel,
            None => NOISE,
        };
    }
    labels
}
