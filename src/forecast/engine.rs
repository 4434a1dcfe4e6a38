use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::analysis::statistics::{mean, std_dev};
use crate::domain::{FeatureVector, ForecastResult};
use crate::ml::{seeded_rng, ModelError, RandomForestModel};

pub const DEFAULT_FORECAST_STEPS: usize = 24;
/// Half-width of the uniform per-step temperature perturbation (°C)
pub const DEFAULT_WALK_AMPLITUDE: f64 = 0.25;
/// z-score of a two-sided 95% interval
pub const DEFAULT_INTERVAL_Z: f64 = 1.96;

/// Means closer to zero than this get zero confidence
const CONFIDENCE_MEAN_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForecastConfig {
    #[validate(range(min = 1))]
    pub steps: usize,
    #[validate(range(min = 0.0))]
    pub walk_amplitude: f64,
    #[validate(range(min = 0.0))]
    pub interval_z: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_FORECAST_STEPS,
            walk_amplitude: DEFAULT_WALK_AMPLITUDE,
            interval_z: DEFAULT_INTERVAL_Z,
        }
    }
}

/// Autoregressive multi-step forecaster.
///
/// Each step predicts from the most recent feature vector, then appends a
/// copy of it whose temperature has taken a small random-walk step. Only the
/// temperature moves; calendar fields stay as they were in the seed vector.
pub struct ForecastEngine {
    config: ForecastConfig,
    rng: StdRng,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn with_seed(config: ForecastConfig, seed: Option<u64>) -> Self {
        Self::new(config, seeded_rng(seed))
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `steps` hourly points starting now.
    pub fn make_forecast(
        &mut self,
        model: &RandomForestModel,
        initial_features: &[FeatureVector],
        steps: usize,
    ) -> Result<Vec<ForecastResult>, ModelError> {
        self.make_forecast_from(Utc::now(), model, initial_features, steps)
    }

    /// Forecast `steps` hourly points, step `s` stamped `start + s` hours.
    pub fn make_forecast_from(
        &mut self,
        start: DateTime<Utc>,
        model: &RandomForestModel,
        initial_features: &[FeatureVector],
        steps: usize,
    ) -> Result<Vec<ForecastResult>, ModelError> {
        let Some(&seed_vector) = initial_features.last() else {
            return Err(ModelError::EmptyFeatures);
        };
        if model.trees.is_empty() {
            return Err(ModelError::InvalidModel("forest has no trees".into()));
        }

        // Only the newest vector is ever read, so the history is not copied
        let mut current = seed_vector;
        let mut forecast = Vec::with_capacity(steps);

        for step in 0..steps {
            let tree_predictions = model.tree_predictions(&current);
            let predicted = mean(&tree_predictions);
            let spread = std_dev(&tree_predictions);
            let margin = self.config.interval_z * spread;

            let result = ForecastResult {
                timestamp: start + Duration::hours(step as i64),
                predicted,
                confidence: forecast_confidence(predicted, spread),
                lower_bound: predicted - margin,
                upper_bound: predicted + margin,
            };
            debug!(
                step,
                predicted,
                interval_width = result.interval_width(),
                temperature = current.temperature,
                "forecast step"
            );
            forecast.push(result);

            current.temperature += self.random_walk_step();
        }

        info!(steps, trees = model.num_trees(), "forecast complete");
        Ok(forecast)
    }

    /// Uniform step in `[-amplitude, amplitude)`.
    fn random_walk_step(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 2.0 * self.config.walk_amplitude
    }
}

/// `1 - std/|mean|` clamped to [0, 1]; 0.0 when the mean is (near) zero.
pub fn forecast_confidence(mean: f64, std_dev: f64) -> f64 {
    if mean.abs() < CONFIDENCE_MEAN_EPSILON {
        return 0.0;
    }
    (1.0 - std_dev / mean.abs()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureName;
    use crate::ml::DecisionTree;
    use rstest::rstest;

    fn leaf(value: f64) -> DecisionTree {
        DecisionTree::Leaf { value }
    }

    fn forest(trees: Vec<DecisionTree>) -> RandomForestModel {
        RandomForestModel {
            trees,
            feature_names: FeatureName::all(),
        }
    }

    fn engine(seed: u64) -> ForecastEngine {
        ForecastEngine::with_seed(ForecastConfig::default(), Some(seed))
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-07-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_identical_trees_give_full_confidence() {
        let model = forest(vec![leaf(2500.0); 3]);
        let results = engine(1)
            .make_forecast_from(start(), &model, &[FeatureVector::default()], 3)
            .unwrap();

        assert_eq!(results.len(), 3);
        for (s, r) in results.iter().enumerate() {
            assert_eq!(r.predicted, 2500.0);
            assert_eq!(r.confidence, 1.0);
            assert_eq!(r.lower_bound, 2500.0);
            assert_eq!(r.upper_bound, 2500.0);
            assert_eq!(r.timestamp, start() + Duration::hours(s as i64));
        }
    }

    #[test]
    fn test_tree_disagreement_widens_interval() {
        // predictions 2000 and 3000: mean 2500, population std 500
        let model = forest(vec![leaf(2000.0), leaf(3000.0)]);
        let results = engine(1)
            .make_forecast_from(start(), &model, &[FeatureVector::default()], 1)
            .unwrap();
        let r = results[0];
        assert_eq!(r.predicted, 2500.0);
        assert!((r.confidence - 0.8).abs() < 1e-12);
        assert!((r.lower_bound - (2500.0 - 1.96 * 500.0)).abs() < 1e-9);
        assert!((r.upper_bound - (2500.0 + 1.96 * 500.0)).abs() < 1e-9);
        assert!(r.lower_bound <= r.predicted && r.predicted <= r.upper_bound);
    }

    #[test]
    fn test_zero_mean_prediction_has_zero_confidence() {
        let model = forest(vec![leaf(-5.0), leaf(5.0)]);
        let results = engine(1)
            .make_forecast_from(start(), &model, &[FeatureVector::default()], 1)
            .unwrap();
        assert_eq!(results[0].predicted, 0.0);
        assert_eq!(results[0].confidence, 0.0);
        assert!(results[0].confidence.is_finite());
    }

    #[rstest]
    #[case(100.0, 0.0, 1.0)]
    #[case(100.0, 25.0, 0.75)]
    #[case(-100.0, 25.0, 0.75)]
    #[case(100.0, 250.0, 0.0)]
    #[case(0.0, 10.0, 0.0)]
    #[case(1e-12, 0.0, 0.0)]
    fn test_forecast_confidence(#[case] mean: f64, #[case] std_dev: f64, #[case] expected: f64) {
        assert!((forecast_confidence(mean, std_dev) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_empty_initial_features() {
        let model = forest(vec![leaf(1.0)]);
        assert!(matches!(
            engine(0).make_forecast(&model, &[], 24),
            Err(ModelError::EmptyFeatures)
        ));
    }

    #[test]
    fn test_empty_forest_rejected() {
        assert!(matches!(
            engine(0).make_forecast(&forest(vec![]), &[FeatureVector::default()], 2),
            Err(ModelError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_zero_steps_is_empty() {
        let model = forest(vec![leaf(1.0)]);
        let results = engine(0).make_forecast(&model, &[FeatureVector::default()], 0).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_random_walk_moves_temperature() {
        // split on temperature so the walk shows up in the prediction
        let model = forest(vec![DecisionTree::Internal {
            feature: FeatureName::Temperature,
            threshold: 20.0,
            left: Box::new(leaf(1000.0)),
            right: Box::new(leaf(2000.0)),
        }]);
        let start_vector = FeatureVector {
            temperature: 20.0,
            ..Default::default()
        };
        // the second step lands on 2000 whenever the first walk step is positive
        let second_steps: Vec<f64> = (0..20)
            .map(|seed| {
                let results = engine(seed)
                    .make_forecast_from(start(), &model, &[start_vector], 2)
                    .unwrap();
                assert_eq!(results[0].predicted, 1000.0);
                results[1].predicted
            })
            .collect();
        assert!(second_steps.contains(&2000.0));
        assert!(second_steps.contains(&1000.0));
    }

    #[test]
    fn test_walk_is_bounded_and_reproducible() {
        let mut a = engine(9);
        let mut b = engine(9);
        for _ in 0..1000 {
            let step = a.random_walk_step();
            assert!(step.abs() <= DEFAULT_WALK_AMPLITUDE);
            assert_eq!(step, b.random_walk_step());
        }
    }

    #[test]
    fn test_uses_last_initial_vector() {
        let model = forest(vec![DecisionTree::Internal {
            feature: FeatureName::HourOfDay,
            threshold: 12.0,
            left: Box::new(leaf(10.0)),
            right: Box::new(leaf(20.0)),
        }]);
        let early = FeatureVector::default();
        let late = FeatureVector {
            hour_of_day: 18.0,
            ..Default::default()
        };
        let results = engine(2)
            .make_forecast_from(start(), &model, &[early, late], 4)
            .unwrap();
        assert!(results.iter().all(|r| r.predicted == 20.0));
    }
}
