//! Bootstrap-aggregated regression forest
//!
//! Each tree is grown on `n` rows drawn uniformly with replacement from the
//! training set. Per-tree seeds are drawn up front from the caller's RNG, so
//! the forest is identical for a given seed whether trees are grown
//! sequentially or in parallel (`parallel` feature).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{build_tree, DecisionTree};
use super::ModelError;
use crate::domain::{FeatureName, FeatureVector};

/// Default number of trees in a forest
pub const DEFAULT_NUM_TREES: usize = 10;

/// Trained ensemble. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomForestModel {
    pub trees: Vec<DecisionTree>,
    /// Schema columns the trees were trained on, in order
    pub feature_names: Vec<FeatureName>,
}

impl RandomForestModel {
    /// Mean of the per-tree predictions.
    pub fn predict(&self, sample: &FeatureVector) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.tree_predictions(sample).iter().sum::<f64>() / self.trees.len() as f64
    }

    /// One prediction per tree, in tree order.
    pub fn tree_predictions(&self, sample: &FeatureVector) -> Vec<f64> {
        self.trees.iter().map(|tree| tree.predict(sample)).collect()
    }

    pub fn predict_batch(&self, samples: &[FeatureVector]) -> Vec<f64> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Deepest tree in the ensemble.
    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }
}

/// Forest prediction for each sample.
pub fn predict_random_forest(samples: &[FeatureVector], model: &RandomForestModel) -> Vec<f64> {
    model.predict_batch(samples)
}

/// Grow `num_trees` trees, each on its own bootstrap sample.
///
/// Fails on empty or length-mismatched input and on `num_trees == 0`, since
/// a forest must contain at least one tree.
pub fn build_forest<R: Rng + ?Sized>(
    features: &[FeatureVector],
    targets: &[f64],
    num_trees: usize,
    max_depth: usize,
    rng: &mut R,
) -> Result<RandomForestModel, ModelError> {
    if features.is_empty() || features.len() != targets.len() {
        return Err(ModelError::InvalidTrainingData {
            features: features.len(),
            targets: targets.len(),
        });
    }
    if num_trees == 0 {
        return Err(ModelError::InvalidParameter("forest needs at least one tree".into()));
    }

    let seeds: Vec<u64> = (0..num_trees).map(|_| rng.gen()).collect();
    let grow_one = |seed: u64| {
        let mut tree_rng = StdRng::seed_from_u64(seed);
        let (sample_features, sample_targets) = bootstrap_sample(features, targets, &mut tree_rng);
        build_tree(&sample_features, &sample_targets, max_depth)
    };

    #[cfg(feature = "parallel")]
    let trees: Vec<DecisionTree> = {
        use rayon::prelude::*;
        seeds.into_par_iter().map(grow_one).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let trees: Vec<DecisionTree> = seeds.into_iter().map(grow_one).collect();

    debug!(num_trees, rows = features.len(), max_depth, "forest built");

    Ok(RandomForestModel {
        trees,
        feature_names: FeatureName::all(),
    })
}

/// Draw `n` rows uniformly with replacement.
fn bootstrap_sample<R: Rng + ?Sized>(
    features: &[FeatureVector],
    targets: &[f64],
    rng: &mut R,
) -> (Vec<FeatureVector>, Vec<f64>) {
    let n = features.len();
    (0..n)
        .map(|_| {
            let idx = rng.gen_range(0..n);
            (features[idx], targets[idx])
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::seeded_rng;
    use crate::ml::tree::DEFAULT_MAX_DEPTH;

    fn linear_data(n: usize) -> (Vec<FeatureVector>, Vec<f64>) {
        let features = (0..n)
            .map(|i| FeatureVector {
                temperature: i as f64 * 0.5,
                humidity: (i % 10) as f64,
                ..Default::default()
            })
            .collect();
        let targets = (0..n).map(|i| 2000.0 + 40.0 * i as f64 * 0.5).collect();
        (features, targets)
    }

    fn seeded_forest(
        features: &[FeatureVector],
        targets: &[f64],
        num_trees: usize,
        seed: u64,
    ) -> RandomForestModel {
        build_forest(features, targets, num_trees, DEFAULT_MAX_DEPTH, &mut seeded_rng(Some(seed)))
            .unwrap()
    }

    #[test]
    fn test_forest_has_requested_trees() {
        let (features, targets) = linear_data(50);
        let model = seeded_forest(&features, &targets, 7, 1);
        assert_eq!(model.num_trees(), 7);
        assert_eq!(model.feature_names.len(), 16);
        assert_eq!(model.feature_names[0], FeatureName::Temperature);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (features, targets) = linear_data(40);
        let a = seeded_forest(&features, &targets, 5, 42);
        let b = seeded_forest(&features, &targets, 5, 42);
        assert_eq!(a, b);
    }

    /// Tree `i` must be grown from the `i`-th seed drawn from the caller's RNG,
    /// so the rayon build matches a plain sequential loop tree for tree.
    #[test]
    fn test_forest_matches_sequential_growth() {
        let (features, targets) = linear_data(60);
        for seed in [0, 11, 2024] {
            let model = seeded_forest(&features, &targets, 8, seed);

            let mut rng = seeded_rng(Some(seed));
            let tree_seeds: Vec<u64> = (0..8).map(|_| rng.gen()).collect();
            let expected: Vec<DecisionTree> = tree_seeds
                .into_iter()
                .map(|tree_seed| {
                    let mut tree_rng = StdRng::seed_from_u64(tree_seed);
                    let (f, t) = bootstrap_sample(&features, &targets, &mut tree_rng);
                    build_tree(&f, &t, DEFAULT_MAX_DEPTH)
                })
                .collect();

            assert_eq!(model.trees, expected);
            for row in &features {
                let mean = expected.iter().map(|t| t.predict(row)).sum::<f64>() / 8.0;
                assert_eq!(model.predict(row), mean);
            }
        }
    }

    #[test]
    fn test_forest_consumes_one_draw_per_tree() {
        let (features, targets) = linear_data(30);
        let mut rng = seeded_rng(Some(77));
        build_forest(&features, &targets, 4, DEFAULT_MAX_DEPTH, &mut rng).unwrap();
        let after_forest: u64 = rng.gen();

        let mut reference = seeded_rng(Some(77));
        for _ in 0..4 {
            let _: u64 = reference.gen();
        }
        assert_eq!(after_forest, reference.gen::<u64>());
    }

    #[test]
    fn test_forest_prediction_is_mean_of_trees() {
        let (features, targets) = linear_data(40);
        let model = seeded_forest(&features, &targets, 6, 3);
        let query = features[17];
        let per_tree = model.tree_predictions(&query);
        let mean = per_tree.iter().sum::<f64>() / per_tree.len() as f64;
        assert_eq!(model.predict(&query), mean);
        assert_eq!(predict_random_forest(&[query], &model), vec![mean]);
    }

    #[test]
    fn test_forest_tracks_trend() {
        let (features, targets) = linear_data(80);
        let model = seeded_forest(&features, &targets, 10, 9);
        let low = model.predict(&features[5]);
        let high = model.predict(&features[75]);
        assert!(high > low);
        assert!((model.predict(&features[40]) - targets[40]).abs() < 200.0);
    }

    #[test]
    fn test_build_forest_rejects_bad_input() {
        let (features, targets) = linear_data(10);
        let mut rng = seeded_rng(Some(0));
        assert!(matches!(
            build_forest(&features, &targets[..5], 3, 5, &mut rng),
            Err(ModelError::InvalidTrainingData { features: 10, targets: 5 })
        ));
        assert!(matches!(
            build_forest(&[], &[], 3, 5, &mut rng),
            Err(ModelError::InvalidTrainingData { .. })
        ));
        assert!(matches!(
            build_forest(&features, &targets, 0, 5, &mut rng),
            Err(ModelError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_bootstrap_sample_draws_from_training_rows() {
        let (features, targets) = linear_data(25);
        let (sf, st) = bootstrap_sample(&features, &targets, &mut seeded_rng(Some(5)));
        assert_eq!(sf.len(), 25);
        assert_eq!(st.len(), 25);
        for (f, t) in sf.iter().zip(st.iter()) {
            let idx = features.iter().position(|x| x == f).unwrap();
            assert_eq!(targets[idx], *t);
        }
    }
}
