//! Binary regression trees grown by variance reduction

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::domain::{FeatureName, FeatureVector};

/// Default maximum tree depth
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// A regression tree node.
///
/// Internal nodes always own both children; leaves carry only a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DecisionTree {
    Leaf {
        value: f64,
    },
    Internal {
        feature: FeatureName,
        threshold: f64,
        left: Box<DecisionTree>,
        right: Box<DecisionTree>,
    },
}

impl DecisionTree {
    /// Route a sample to a leaf: `value <= threshold` goes left.
    pub fn predict(&self, sample: &FeatureVector) -> f64 {
        let mut node = self;
        loop {
            match node {
                DecisionTree::Leaf { value } => return *value,
                DecisionTree::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample.get(*feature) <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            DecisionTree::Leaf { .. } => 0,
            DecisionTree::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            DecisionTree::Leaf { .. } => 1,
            DecisionTree::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, DecisionTree::Leaf { .. })
    }

    /// Features used by internal nodes, in depth-first order.
    pub fn split_features(&self) -> Vec<FeatureName> {
        let mut features = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let DecisionTree::Internal {
                feature,
                left,
                right,
                ..
            } = node
            {
                features.push(*feature);
                stack.push(right);
                stack.push(left);
            }
        }
        features
    }

    /// First non-finite threshold or leaf value, if any.
    pub(crate) fn find_non_finite(&self) -> Option<f64> {
        match self {
            DecisionTree::Leaf { value } => (!value.is_finite()).then_some(*value),
            DecisionTree::Internal {
                threshold,
                left,
                right,
                ..
            } => {
                if !threshold.is_finite() {
                    return Some(*threshold);
                }
                left.find_non_finite().or_else(|| right.find_non_finite())
            }
        }
    }
}

/// Predict one sample with one tree.
pub fn predict_tree(sample: &FeatureVector, tree: &DecisionTree) -> f64 {
    tree.predict(sample)
}

/// Grow a regression tree on `features`/`targets` (same length).
///
/// Terminal conditions, checked in order: no rows (leaf 0.0), depth limit
/// reached (leaf at the mean), all targets equal (leaf at that value).
/// Otherwise the split with the largest variance reduction over every
/// feature and every midpoint between consecutive distinct values is taken;
/// when no split reduces variance the node becomes a mean leaf.
pub fn build_tree(features: &[FeatureVector], targets: &[f64], max_depth: usize) -> DecisionTree {
    let n = features.len().min(targets.len());
    let rows: Vec<usize> = (0..n).collect();
    grow(features, targets, &rows, max_depth, 0)
}

/// Best split found for one node
#[derive(Debug, Clone, Copy)]
struct Split {
    feature: FeatureName,
    threshold: f64,
    gain: f64,
}

fn grow(
    features: &[FeatureVector],
    targets: &[f64],
    rows: &[usize],
    max_depth: usize,
    depth: usize,
) -> DecisionTree {
    if rows.is_empty() {
        return DecisionTree::Leaf { value: 0.0 };
    }

    let node_mean = rows.iter().map(|&r| targets[r]).sum::<f64>() / rows.len() as f64;
    if depth >= max_depth {
        return DecisionTree::Leaf { value: node_mean };
    }

    let first = targets[rows[0]];
    if rows.iter().all(|&r| targets[r] == first) {
        return DecisionTree::Leaf { value: first };
    }

    let Some(split) = best_split(features, targets, rows) else {
        return DecisionTree::Leaf { value: node_mean };
    };

    // Stable partition keeps row order within each child
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .copied()
        .partition(|&r| features[r].get(split.feature) <= split.threshold);

    DecisionTree::Internal {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(features, targets, &left_rows, max_depth, depth + 1)),
        right: Box::new(grow(features, targets, &right_rows, max_depth, depth + 1)),
    }
}

/// Exhaustive search for the split with maximal variance reduction.
///
/// For a split into `l` and `r` rows the reduction
/// `Var(parent) - (n_l Var(l) + n_r Var(r)) / n` equals the between-group
/// variance `n_l n_r / n^2 (mean_l - mean_r)^2`, which is evaluated here from
/// running sums over the rows sorted by feature value. Only strictly larger
/// gains replace the incumbent, so the first feature in schema order and the
/// lowest threshold win ties.
fn best_split(features: &[FeatureVector], targets: &[f64], rows: &[usize]) -> Option<Split> {
    let n = rows.len() as f64;
    let total: f64 = rows.iter().map(|&r| targets[r]).sum();
    let mut best: Option<Split> = None;

    for feature in FeatureName::iter() {
        let sorted: Vec<(f64, f64)> = rows
            .iter()
            .map(|&r| (features[r].get(feature), targets[r]))
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .collect();

        let mut left_sum = 0.0;
        for (i, ((value, target), (next_value, _))) in sorted.iter().tuple_windows().enumerate() {
            left_sum += target;
            let left_count = i + 1;
            if value == next_value {
                continue;
            }

            let right_count = rows.len() - left_count;
            let left_mean = left_sum / left_count as f64;
            let right_mean = (total - left_sum) / right_count as f64;
            let weight = (left_count as f64) * (right_count as f64) / (n * n);
            let gain = weight * (left_mean - right_mean).powi(2);

            if gain > best.map_or(0.0, |b| b.gain) {
                best = Some(Split {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
