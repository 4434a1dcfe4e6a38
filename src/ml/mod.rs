//! Machine Learning Module
//!
//! Regression-tree ensemble for predicting load from weather features:
//! - Binary regression trees grown by variance reduction
//! - Bootstrap-aggregated forests
//! - Chronological training, k-fold cross-validation and grid search
//! - JSON model persistence
//!
//! # Randomness
//! Every operation that samples takes an explicit RNG. Use [`seeded_rng`] with
//! `Some(seed)` for reproducible runs and `None` for an entropy-seeded one.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub mod forest;
pub mod training;
pub mod tree;

pub use forest::*;
pub use training::*;
pub use tree::*;

/// Errors raised by training, persistence and forecasting entry points
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("training data arrays have differing or zero length: {features} features, {targets} targets")]
    InvalidTrainingData { features: usize, targets: usize },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no initial feature vectors to forecast from")]
    EmptyFeatures,

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("model serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Hold-out evaluation of a trained model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    /// Root Mean Square Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (%)
    pub mape: f64,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Wall-clock training time (ms)
    pub train_time_ms: f64,
}

impl ModelMetrics {
    /// Check if metrics meet quality thresholds
    pub fn meets_quality_threshold(&self, max_mape: f64, min_r_squared: f64) -> bool {
        self.mape <= max_mape && self.r_squared >= min_r_squared
    }
}

/// StdRng from a fixed seed, or from OS entropy when `seed` is `None`.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_model_metrics_quality_threshold() {
        let metrics = ModelMetrics {
            rmse: 120.0,
            mape: 5.0,
            r_squared: 0.95,
            train_time_ms: 12.0,
        };

        assert!(metrics.meets_quality_threshold(10.0, 0.9));
        assert!(!metrics.meets_quality_threshold(3.0, 0.9));
        assert!(!metrics.meets_quality_threshold(10.0, 0.97));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = seeded_rng(Some(7));
        let mut b = seeded_rng(Some(7));
        for _ in 0..4 {
            assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        }
    }

    #[test]
    fn test_error_messages() {
        let err = ModelError::InvalidTrainingData { features: 3, targets: 2 };
        assert!(err.to_string().starts_with("training data arrays have differing or zero length"));
    }
}
