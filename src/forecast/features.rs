//! Feature engineering for load forecasting models
//!
//! This module turns raw temperature/humidity/timestamp series into
//! [`FeatureVector`]s: cyclical time encodings, causal thermal momentum,
//! anomaly flags, importance scores and min-max scaling.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::analysis::statistics::{mean, pearson_correlation, std_dev};
use crate::domain::{FeatureName, FeatureVector, Observation};
use crate::ml::{ModelError, TrainingData};

/// Period used to wrap temperature onto the unit circle (°C)
pub const TEMPERATURE_ENCODING_PERIOD: f64 = 50.0;
/// Short thermal momentum window (hours)
pub const SHORT_MOMENTUM_WINDOW: usize = 3;
/// Long thermal momentum window (hours)
pub const LONG_MOMENTUM_WINDOW: usize = 24;
pub const DEFAULT_ANOMALY_WINDOW: usize = 24;
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 3.0;

const PEAK_HOURS: [u32; 3] = [8, 12, 18];

/// Calendar features of a single timestamp (local wall clock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of week (0=Sunday, 6=Saturday)
    pub day_of_week: u32,
    /// Day of year (1-366)
    pub day_of_year: u32,
    /// Month (1-12)
    pub month: u32,
    /// 09:00 - 17:59
    pub is_business_hour: bool,
    /// 08, 12 or 18 o'clock
    pub is_peak_hour: bool,
    /// Saturday or Sunday
    pub is_weekend: bool,
}

/// Map `value` onto the unit circle so that the ends of a cycle are adjacent
/// (hour 23 next to hour 0, December next to January).
///
/// Returns `(sin, cos)`. A zero period maps everything to angle 0.
pub fn cyclical_encode(value: f64, period: f64) -> (f64, f64) {
    if period == 0.0 {
        return (0.0, 1.0);
    }
    let radians = TAU * value / period;
    (radians.sin(), radians.cos())
}

/// Trailing mean over the last `window_size` points ending at each index.
///
/// Never looks ahead; the window is clipped at the start of the series.
pub fn thermal_momentum(temperatures: &[f64], window_size: usize) -> Vec<f64> {
    (0..temperatures.len())
        .map(|i| mean(trailing_window(temperatures, i, window_size)))
        .collect()
}

fn trailing_window(values: &[f64], index: usize, window_size: usize) -> &[f64] {
    let start = (index + 1).saturating_sub(window_size.max(1));
    &values[start..=index]
}

/// Extract calendar features from a timestamp
pub fn extract_temporal_features(timestamp: &DateTime<FixedOffset>) -> TemporalFeatures {
    let hour = timestamp.hour();
    let day_of_week = timestamp.weekday().num_days_from_sunday();

    TemporalFeatures {
        hour,
        day_of_week,
        day_of_year: timestamp.ordinal(),
        month: timestamp.month(),
        is_business_hour: (9..=17).contains(&hour),
        is_peak_hour: PEAK_HOURS.contains(&hour),
        is_weekend: day_of_week == 0 || day_of_week == 6,
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Assemble the complete feature vector for one observation
pub fn build_feature_vector(
    temperature: f64,
    humidity: f64,
    momentum_3h: f64,
    momentum_24h: f64,
    timestamp: &DateTime<FixedOffset>,
) -> FeatureVector {
    let temporal = extract_temporal_features(timestamp);
    let (temperature_sin, temperature_cos) =
        cyclical_encode(temperature, TEMPERATURE_ENCODING_PERIOD);
    let (hour_sin, hour_cos) = cyclical_encode(temporal.hour as f64, 24.0);
    let (month_sin, month_cos) = cyclical_encode(temporal.month as f64, 12.0);

    FeatureVector {
        temperature,
        humidity,
        thermal_momentum_3h: momentum_3h,
        thermal_momentum_24h: momentum_24h,
        hour_of_day: temporal.hour as f64,
        day_of_week: temporal.day_of_week as f64,
        day_of_year: temporal.day_of_year as f64,
        is_business_hour: flag(temporal.is_business_hour),
        is_peak_hour: flag(temporal.is_peak_hour),
        is_weekend: flag(temporal.is_weekend),
        temperature_sin,
        temperature_cos,
        hour_sin,
        hour_cos,
        month_sin,
        month_cos,
    }
}

/// Build one feature vector per observation, with load as the target.
pub fn build_feature_vectors(observations: &[Observation]) -> Vec<FeatureVector> {
    let temperatures: Vec<f64> = observations.iter().map(|o| o.temperature).collect();
    let short = thermal_momentum(&temperatures, SHORT_MOMENTUM_WINDOW);
    let long = thermal_momentum(&temperatures, LONG_MOMENTUM_WINDOW);

    observations
        .iter()
        .zip(short.iter().zip(long.iter()))
        .map(|(o, (m3, m24))| {
            build_feature_vector(o.temperature, o.humidity, *m3, *m24, &o.timestamp)
        })
        .collect()
}

/// Turn chronologically ordered observations into training data.
pub fn build_training_data(observations: &[Observation]) -> Result<TrainingData, ModelError> {
    let features = build_feature_vectors(observations);
    let targets = observations.iter().map(|o| o.load).collect();
    TrainingData::new(features, targets)
}

/// Importance of one feature column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: FeatureName,
    /// |Pearson correlation| with the target
    pub score: f64,
}

/// Score every schema column by absolute correlation with the targets.
///
/// Sorted descending; equal scores keep schema order.
pub fn score_feature_importance(
    features: &[FeatureVector],
    targets: &[f64],
) -> Vec<FeatureImportance> {
    let mut scores: Vec<FeatureImportance> = FeatureName::iter()
        .map(|feature| FeatureImportance {
            feature,
            score: pearson_correlation(&FeatureVector::column(features, feature), targets).abs(),
        })
        .collect();
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores
}

/// Min-max bounds of one feature column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerEntry {
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

/// Per-column min-max scaler fitted by [`normalize_features`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub entries: BTreeMap<FeatureName, ScalerEntry>,
}

impl FeatureScaler {
    /// Fit bounds on a set of vectors. Empty input yields an empty scaler.
    pub fn fit(features: &[FeatureVector]) -> Self {
        if features.is_empty() {
            return Self::default();
        }
        let entries = FeatureName::iter()
            .map(|name| {
                let (min, max) = features.iter().map(|f| f.get(name)).fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), v| (lo.min(v), hi.max(v)),
                );
                (name, ScalerEntry { min, max, range: max - min })
            })
            .collect();
        Self { entries }
    }

    /// Scale into [0, 1] using the fitted bounds; a zero range maps to 0.
    pub fn transform(&self, feature: &FeatureVector) -> FeatureVector {
        let mut out = *feature;
        for (&name, entry) in &self.entries {
            let scaled = if entry.range == 0.0 {
                0.0
            } else {
                (feature.get(name) - entry.min) / entry.range
            };
            out.set(name, scaled);
        }
        out
    }

    /// Map scaled values back to the original units.
    pub fn inverse_transform(&self, scaled: &FeatureVector) -> FeatureVector {
        let mut out = *scaled;
        for (&name, entry) in &self.entries {
            out.set(name, entry.min + scaled.get(name) * entry.range);
        }
        out
    }
}

/// Min-max normalize every column, returning the scaled vectors and the scaler.
pub fn normalize_features(features: &[FeatureVector]) -> (Vec<FeatureVector>, FeatureScaler) {
    let scaler = FeatureScaler::fit(features);
    let normalized = features.iter().map(|f| scaler.transform(f)).collect();
    (normalized, scaler)
}

/// Flag points that deviate from their trailing window by more than
/// `threshold` standard deviations.
///
/// The window includes the point itself and is clipped at the series start.
pub fn detect_anomalies(values: &[f64], window_size: usize, threshold: f64) -> Vec<bool> {
    (0..values.len())
        .map(|i| {
            let window = trailing_window(values, i, window_size);
            (values[i] - mean(window)).abs() > threshold * std_dev(window)
        })
        .collect()
}
