//! ML Model Training Pipeline
//!
//! Chronological hold-out training, k-fold cross-validation, grid search over
//! the forest size and JSON persistence of trained models.

use std::time::Instant;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

use super::forest::{build_forest, RandomForestModel};
use super::tree::DEFAULT_MAX_DEPTH;
use super::{seeded_rng, ModelError, ModelMetrics};
use crate::analysis::statistics::{mape, r_squared, rmse};
use crate::domain::FeatureVector;

/// Fraction of rows used for fitting in [`ModelTrainer::train_model`]
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;
pub const DEFAULT_CV_FOLDS: usize = 5;
/// Folds per candidate during grid search
pub const GRID_SEARCH_FOLDS: usize = 3;
pub const DEFAULT_NUM_TREES_OPTIONS: [usize; 4] = [5, 10, 20, 50];

/// Training Dataset
///
/// Index-aligned feature rows and load targets, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingData {
    pub fn new(features: Vec<FeatureVector>, targets: Vec<f64>) -> Result<Self, ModelError> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(ModelError::InvalidTrainingData {
                features: features.len(),
                targets: targets.len(),
            });
        }
        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split dataset into training and validation sets
    pub fn split(&self, train_ratio: f64) -> Result<ChronologicalSplit<'_>, ModelError> {
        chronological_split(&self.features, &self.targets, train_ratio)
    }
}

/// Prefix/suffix views of a chronologically ordered dataset
#[derive(Debug, Clone, Copy)]
pub struct ChronologicalSplit<'a> {
    pub train_features: &'a [FeatureVector],
    pub train_targets: &'a [f64],
    pub test_features: &'a [FeatureVector],
    pub test_targets: &'a [f64],
}

/// Split at `floor(n * train_ratio)` without shuffling, so no future row
/// leaks into the training prefix.
pub fn chronological_split<'a>(
    features: &'a [FeatureVector],
    targets: &'a [f64],
    train_ratio: f64,
) -> Result<ChronologicalSplit<'a>, ModelError> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(ModelError::InvalidParameter(format!(
            "train ratio must be between 0 and 1, got {train_ratio}"
        )));
    }
    if features.len() != targets.len() {
        return Err(ModelError::InvalidTrainingData {
            features: features.len(),
            targets: targets.len(),
        });
    }

    let split_idx = (features.len() as f64 * train_ratio).floor() as usize;
    let (train_features, test_features) = features.split_at(split_idx);
    let (train_targets, test_targets) = targets.split_at(split_idx);

    Ok(ChronologicalSplit {
        train_features,
        train_targets,
        test_features,
        test_targets,
    })
}

/// Training Configuration
///
/// Forest size and fold counts are per-call arguments; this only holds what
/// every training run shares.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrainingConfig {
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub train_ratio: f64,
    pub max_depth: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_ratio: DEFAULT_TRAIN_RATIO,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Serialized training artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainedModel {
    pub model_id: String,
    pub model: RandomForestModel,
    pub metrics: ModelMetrics,
    pub train_date: DateTime<Utc>,
}

/// Averaged k-fold metrics, with the per-fold breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossValidationResult {
    pub avg_rmse: f64,
    pub avg_mape: f64,
    pub avg_r_squared: f64,
    pub folds: Vec<ModelMetrics>,
    /// Number of held-out rows per fold
    pub fold_sizes: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSearchCandidate {
    pub num_trees: usize,
    pub avg_r_squared: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSearchResult {
    pub best_num_trees: usize,
    pub best_r_squared: f64,
    /// Every evaluated candidate, in option order
    pub candidates: Vec<GridSearchCandidate>,
}

/// Model Trainer
///
/// Owns the RNG that drives bootstrap sampling, so a trainer built with a
/// fixed seed reproduces the same models call for call.
pub struct ModelTrainer {
    config: TrainingConfig,
    rng: StdRng,
}

impl ModelTrainer {
    /// Fails with `InvalidParameter` when `config` is out of range.
    pub fn new(config: TrainingConfig, rng: StdRng) -> Result<Self, ModelError> {
        config
            .validate()
            .map_err(|e| ModelError::InvalidParameter(format!("training config: {e}")))?;
        Ok(Self { config, rng })
    }

    /// Trainer seeded from `seed`, or from entropy when `None`.
    pub fn with_seed(config: TrainingConfig, seed: Option<u64>) -> Result<Self, ModelError> {
        Self::new(config, seeded_rng(seed))
    }

    /// Fit on the chronological prefix and score on the suffix.
    pub fn train_model(
        &mut self,
        data: &TrainingData,
        num_trees: usize,
    ) -> Result<TrainedModel, ModelError> {
        validate_shape(data)?;
        let split = data.split(self.config.train_ratio)?;
        if split.train_features.is_empty() {
            return Err(ModelError::InsufficientData(format!(
                "{} rows leave no training rows at ratio {}",
                data.len(),
                self.config.train_ratio
            )));
        }

        let seed = self.rng.gen();
        let (model, metrics) = fit_and_evaluate(
            split.train_features,
            split.train_targets,
            split.test_features,
            split.test_targets,
            num_trees,
            self.config.max_depth,
            seed,
        )?;

        let trained = TrainedModel {
            model_id: format!("rf_{}", uuid::Uuid::new_v4()),
            model,
            metrics,
            train_date: Utc::now(),
        };

        info!(
            model_id = %trained.model_id,
            num_trees,
            max_tree_depth = trained.model.max_tree_depth(),
            train_rows = split.train_features.len(),
            test_rows = split.test_features.len(),
            rmse = metrics.rmse,
            mape = metrics.mape,
            r_squared = metrics.r_squared,
            train_time_ms = metrics.train_time_ms,
            "model trained"
        );
        if metrics.r_squared < 0.0 {
            warn!(r_squared = metrics.r_squared, "model is worse than predicting the mean");
        }

        Ok(trained)
    }

    /// Contiguous k-fold cross-validation.
    ///
    /// Folds hold `floor(n / k)` rows each and the last one absorbs the
    /// remainder. Each fold trains on every other row in original order.
    pub fn k_fold_cross_validation(
        &mut self,
        data: &TrainingData,
        k: usize,
        num_trees: usize,
    ) -> Result<CrossValidationResult, ModelError> {
        validate_shape(data)?;
        let n = data.len();
        if k < 2 || k > n {
            return Err(ModelError::InvalidParameter(format!(
                "k must be between 2 and the number of rows ({n}), got {k}"
            )));
        }

        let fold_size = n / k;
        let max_depth = self.config.max_depth;
        let tasks: Vec<(usize, usize, u64)> = (0..k)
            .map(|fold| {
                let start = fold * fold_size;
                let end = if fold == k - 1 { n } else { start + fold_size };
                (start, end, self.rng.gen())
            })
            .collect();

        let run_fold = |&(start, end, seed): &(usize, usize, u64)| -> Result<_, ModelError> {
            let train_features: Vec<FeatureVector> = data.features[..start]
                .iter()
                .chain(&data.features[end..])
                .copied()
                .collect();
            let train_targets: Vec<f64> = data.targets[..start]
                .iter()
                .chain(&data.targets[end..])
                .copied()
                .collect();

            let (_, metrics) = fit_and_evaluate(
                &train_features,
                &train_targets,
                &data.features[start..end],
                &data.targets[start..end],
                num_trees,
                max_depth,
                seed,
            )?;
            debug!(start, end, r_squared = metrics.r_squared, "fold evaluated");
            Ok(metrics)
        };

        #[cfg(feature = "parallel")]
        let folds: Vec<ModelMetrics> = {
            use rayon::prelude::*;
            tasks.par_iter().map(run_fold).collect::<Result<_, _>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let folds: Vec<ModelMetrics> = tasks.iter().map(run_fold).collect::<Result<_, _>>()?;

        let kf = k as f64;
        let result = CrossValidationResult {
            avg_rmse: folds.iter().map(|m| m.rmse).sum::<f64>() / kf,
            avg_mape: folds.iter().map(|m| m.mape).sum::<f64>() / kf,
            avg_r_squared: folds.iter().map(|m| m.r_squared).sum::<f64>() / kf,
            fold_sizes: tasks.iter().map(|(start, end, _)| end - start).collect(),
            folds,
        };

        info!(
            k,
            num_trees,
            avg_rmse = result.avg_rmse,
            avg_mape = result.avg_mape,
            avg_r_squared = result.avg_r_squared,
            "cross-validation complete"
        );
        Ok(result)
    }

    /// Pick the forest size with the best 3-fold average R².
    ///
    /// Candidates are evaluated in order and only a strictly better score
    /// replaces the incumbent.
    pub fn grid_search_hyperparameters(
        &mut self,
        data: &TrainingData,
        num_trees_options: &[usize],
    ) -> Result<GridSearchResult, ModelError> {
        let Some(&first) = num_trees_options.first() else {
            return Err(ModelError::InvalidParameter("no tree counts to search".into()));
        };

        let mut best_num_trees = first;
        let mut best_r_squared = f64::NEG_INFINITY;
        let mut candidates = Vec::with_capacity(num_trees_options.len());

        for &num_trees in num_trees_options {
            let cv = self.k_fold_cross_validation(data, GRID_SEARCH_FOLDS, num_trees)?;
            candidates.push(GridSearchCandidate {
                num_trees,
                avg_r_squared: cv.avg_r_squared,
            });
            if cv.avg_r_squared > best_r_squared {
                best_r_squared = cv.avg_r_squared;
                best_num_trees = num_trees;
            }
        }

        info!(best_num_trees, best_r_squared, "grid search complete");
        Ok(GridSearchResult {
            best_num_trees,
            best_r_squared,
            candidates,
        })
    }
}

fn validate_shape(data: &TrainingData) -> Result<(), ModelError> {
    if data.features.is_empty() || data.features.len() != data.targets.len() {
        return Err(ModelError::InvalidTrainingData {
            features: data.features.len(),
            targets: data.targets.len(),
        });
    }
    Ok(())
}

/// Build a forest on the training rows and score it on the test rows.
fn fit_and_evaluate(
    train_features: &[FeatureVector],
    train_targets: &[f64],
    test_features: &[FeatureVector],
    test_targets: &[f64],
    num_trees: usize,
    max_depth: usize,
    seed: u64,
) -> Result<(RandomForestModel, ModelMetrics), ModelError> {
    let start = Instant::now();
    let model = build_forest(
        train_features,
        train_targets,
        num_trees,
        max_depth,
        &mut StdRng::seed_from_u64(seed),
    )?;
    let predictions = model.predict_batch(test_features);

    let metrics = ModelMetrics {
        rmse: rmse(test_targets, &predictions),
        mape: mape(test_targets, &predictions),
        r_squared: r_squared(test_targets, &predictions),
        train_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    Ok((model, metrics))
}

/// Pretty-printed JSON form of a trained model.
pub fn serialize_model(trained: &TrainedModel) -> Result<String, ModelError> {
    Ok(serde_json::to_string_pretty(trained)?)
}

/// Parse a model produced by [`serialize_model`] and check that it can
/// be used for prediction.
pub fn deserialize_model(json: &str) -> Result<TrainedModel, ModelError> {
    let trained: TrainedModel = serde_json::from_str(json)?;

    if trained.model.trees.is_empty() {
        return Err(ModelError::InvalidModel("forest has no trees".into()));
    }
    let feature_names = &trained.model.feature_names;
    if feature_names.is_empty() {
        return Err(ModelError::InvalidModel("forest has no feature names".into()));
    }
    if let Some(repeated) = feature_names.iter().duplicates().next() {
        return Err(ModelError::InvalidModel(format!(
            "feature name {repeated} is listed more than once"
        )));
    }
    for (index, tree) in trained.model.trees.iter().enumerate() {
        if let Some(feature) = tree
            .split_features()
            .into_iter()
            .find(|f| !feature_names.contains(f))
        {
            return Err(ModelError::InvalidModel(format!(
                "tree {index} splits on {feature}, which is not in the feature names"
            )));
        }
    }
    if let Some((index, value)) = trained
        .model
        .trees
        .iter()
        .enumerate()
        .find_map(|(i, tree)| tree.find_non_finite().map(|v| (i, v)))
    {
        return Err(ModelError::InvalidModel(format!(
            "tree {index} contains non-finite value {value}"
        )));
    }

    Ok(trained)
}
