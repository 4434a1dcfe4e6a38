//! Forecast Metrics and Evaluation
//!
//! Scores a forecast against what was later observed: point accuracy (MAPE,
//! RMSE) and how often the uncertainty band contained the actual value
//! (prediction interval coverage probability, PICP).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::statistics::{mape, rmse};
use crate::domain::ForecastResult;

/// Prediction interval for one forecast step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalBounds {
    pub lower: f64,
    pub upper: f64,
}

impl IntervalBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

impl From<&ForecastResult> for IntervalBounds {
    fn from(result: &ForecastResult) -> Self {
        Self {
            lower: result.lower_bound,
            upper: result.upper_bound,
        }
    }
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Percentage Error (%)
    pub mape: f64,
    /// Root Mean Square Error
    pub rmse: f64,
    /// Fraction of actual values inside their interval (0.0 - 1.0)
    pub picp: f64,
    /// Number of samples evaluated
    pub sample_count: usize,
}

impl ForecastAccuracy {
    /// Assess forecast quality based on MAPE
    pub fn quality(&self) -> ForecastQuality {
        if self.mape < 5.0 {
            ForecastQuality::Excellent
        } else if self.mape < 10.0 {
            ForecastQuality::Good
        } else if self.mape < 20.0 {
            ForecastQuality::Fair
        } else if self.mape < 50.0 {
            ForecastQuality::Poor
        } else {
            ForecastQuality::VeryPoor
        }
    }
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accuracy: MAPE={:.2}%, RMSE={:.3}, PICP={:.3}, Quality={:?}",
            self.mape,
            self.rmse,
            self.picp,
            self.quality()
        )
    }
}

/// Forecast quality classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastQuality {
    Excellent, // MAPE < 5%
    Good,      // MAPE 5-10%
    Fair,      // MAPE 10-20%
    Poor,      // MAPE 20-50%
    VeryPoor,  // MAPE > 50%
}

/// Forecast accuracy calculation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastAccuracyError {
    #[error("Dimension mismatch: actual={actual}, predicted={predicted}, bounds={bounds}")]
    DimensionMismatch {
        actual: usize,
        predicted: usize,
        bounds: usize,
    },

    #[error("Empty data provided")]
    EmptyData,
}

/// Score predictions and their intervals against observed values.
///
/// Zero actuals are skipped in the MAPE numerator but still count towards
/// the sample size.
pub fn evaluate_forecast_accuracy(
    actual: &[f64],
    predicted: &[f64],
    bounds: &[IntervalBounds],
) -> Result<ForecastAccuracy, ForecastAccuracyError> {
    if actual.len() != predicted.len() || actual.len() != bounds.len() {
        return Err(ForecastAccuracyError::DimensionMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
            bounds: bounds.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastAccuracyError::EmptyData);
    }

    let covered = actual
        .iter()
        .zip(bounds.iter())
        .filter(|(a, b)| b.contains(**a))
        .count();

    Ok(ForecastAccuracy {
        mape: mape(actual, predicted),
        rmse: rmse(actual, predicted),
        picp: covered as f64 / actual.len() as f64,
        sample_count: actual.len(),
    })
}

/// [`evaluate_forecast_accuracy`] over engine output.
pub fn evaluate_forecast_results(
    actual: &[f64],
    forecast: &[ForecastResult],
) -> Result<ForecastAccuracy, ForecastAccuracyError> {
    let predicted: Vec<f64> = forecast.iter().map(|r| r.predicted).collect();
    let bounds: Vec<IntervalBounds> = forecast.iter().map(IntervalBounds::from).collect();
    evaluate_forecast_accuracy(actual, &predicted, &bounds)
}
