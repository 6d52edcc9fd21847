//! CART tree growing with Gini impurity.
//!
//! Nodes are expanded depth-first from an explicit stack. Each node owns a
//! contiguous range of the sample index buffer, which is partitioned in
//! place when the node splits.

use ndarray::ArrayView2;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::config::ForestConfig;
use super::tree::{DecisionTree, NodeId};
use crate::model::ClassId;

/// Stopping rules resolved against the training matrix.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowerParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

impl GrowerParams {
    pub fn from_config(config: &ForestConfig, n_features: usize) -> Self {
        Self {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(n_features),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Gini impurity of a count vector holding `n` samples.
#[inline]
fn gini(counts: &[f64], n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / n) * (c / n)).sum::<f64>()
}

/// Grows single trees over a shared training matrix.
pub(crate) struct TreeGrower<'a, 'b> {
    features: ArrayView2<'a, f64>,
    targets: &'b [ClassId],
    n_classes: usize,
    params: GrowerParams,
}

impl<'a, 'b> TreeGrower<'a, 'b> {
    pub fn new(
        features: ArrayView2<'a, f64>,
        targets: &'b [ClassId],
        n_classes: usize,
        params: GrowerParams,
    ) -> Self {
        Self {
            features,
            targets,
            n_classes,
            params,
        }
    }

    /// Grow one tree over `samples` (row indices, repeats allowed).
    pub fn grow(&self, mut samples: Vec<usize>, rng: &mut Xoshiro256PlusPlus) -> DecisionTree {
        let mut tree = DecisionTree::with_classes(self.n_classes);
        let mut feature_order: Vec<usize> = (0..self.features.ncols()).collect();

        let root_counts = self.class_counts(&samples);
        let root = tree.push_leaf(&Self::to_distribution(&root_counts));
        let mut stack: Vec<(NodeId, usize, usize, usize, Vec<f64>)> =
            vec![(root, 0, samples.len(), 0, root_counts)];

        while let Some((node, start, end, depth, counts)) = stack.pop() {
            let node_samples = &mut samples[start..end];
            if !self.can_split(node_samples.len(), depth, &counts) {
                continue;
            }
            let Some(split) =
                self.find_best_split(node_samples, &counts, &mut feature_order, rng)
            else {
                continue;
            };

            let n_left = partition(node_samples, |row| {
                self.features[[row, split.feature]] <= split.threshold
            });
            let left_counts = self.class_counts(&node_samples[..n_left]);
            let right_counts = self.class_counts(&node_samples[n_left..]);

            let left = tree.push_leaf(&Self::to_distribution(&left_counts));
            let right = tree.push_leaf(&Self::to_distribution(&right_counts));
            tree.set_split(node, split.feature, split.threshold, left, right);

            stack.push((right, start + n_left, end, depth + 1, right_counts));
            stack.push((left, start, start + n_left, depth + 1, left_counts));
        }

        tree
    }

    fn can_split(&self, n: usize, depth: usize, counts: &[f64]) -> bool {
        if self.params.max_depth.is_some_and(|max| depth >= max) {
            return false;
        }
        if n < self.params.min_samples_split || n < 2 * self.params.min_samples_leaf {
            return false;
        }
        // Pure nodes stay leaves.
        counts.iter().filter(|&&c| c > 0.0).count() > 1
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &row in samples {
            counts[self.targets[row].index()] += 1.0;
        }
        counts
    }

    fn to_distribution(counts: &[f64]) -> Vec<f64> {
        let total: f64 = counts.iter().sum();
        if total <= 0.0 {
            return vec![0.0; counts.len()];
        }
        counts.iter().map(|c| c / total).collect()
    }

    /// Search up to `max_features` non-constant features in random order.
    ///
    /// Constant features are skipped without counting against the budget,
    /// so a node only becomes a leaf when no feature can separate it.
    fn find_best_split(
        &self,
        samples: &[usize],
        parent_counts: &[f64],
        feature_order: &mut [usize],
        rng: &mut Xoshiro256PlusPlus,
    ) -> Option<Split> {
        feature_order.shuffle(rng);

        let n = samples.len();
        let n_total = n as f64;
        let min_leaf = self.params.min_samples_leaf;
        let mut sorted = samples.to_vec();
        let mut best: Option<Split> = None;
        let mut examined = 0;

        for &feature in feature_order.iter() {
            if examined >= self.params.max_features {
                break;
            }
            let column = self.features.column(feature);
            sorted.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
            if column[sorted[n - 1]] <= column[sorted[0]] {
                continue;
            }
            examined += 1;

            let mut left = vec![0.0; self.n_classes];
            let mut right = parent_counts.to_vec();
            for pos in 0..n - 1 {
                let class = self.targets[sorted[pos]].index();
                left[class] += 1.0;
                right[class] -= 1.0;

                let value = column[sorted[pos]];
                let next = column[sorted[pos + 1]];
                if next <= value {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let (nl, nr) = (n_left as f64, n_right as f64);
                let impurity = (nl * gini(&left, nl) + nr * gini(&right, nr)) / n_total;
                if best.is_none_or(|b| impurity < b.impurity) {
                    best = Some(Split {
                        feature,
                        threshold: midpoint(value, next),
                        impurity,
                    });
                }
            }
        }
        best
    }
}

/// Threshold between two distinct sorted values that keeps `lo` on the left
/// and `hi` on the right.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi || !mid.is_finite() { lo } else { mid }
}

/// In-place partition; returns the number of elements for
/// which `pred` holds, which are moved to the front.
fn partition(items: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut boundary = 0;
    for i in 0..items.len() {
        if pred(items[i]) {
            items.swap(boundary, i);
            boundary += 1;
        }
    }
    boundary
}
