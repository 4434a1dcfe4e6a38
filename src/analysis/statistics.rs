//! Statistical primitives for weather/load analysis
//!
//! Every function here is total: empty or length-mismatched input yields a
//! neutral value (0.0 or an empty vector) instead of an error, and every
//! denominator is guarded so NaN and infinity never escape.

use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-10;

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance, 0.0 for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Pearson correlation coefficient in [-1, 1].
///
/// Returns 0.0 for mismatched lengths, empty input, or a series without
/// variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut numerator = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        numerator += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    let denominator = (denom_x * denom_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (numerator / denominator).clamp(-1.0, 1.0)
}

/// Ordinary least squares slope of `y` against `x`.
///
/// Used as thermal elasticity (load change per degree). Returns 0.0 for
/// fewer than two points, mismatched lengths, or constant `x`.
pub fn linear_slope(x: &[f64], y: &[f64]) -> f64 {
    if x.len() < 2 || x.len() != y.len() {
        return 0.0;
    }

    let n = x.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y.iter()) {
        sum_x += xi;
        sum_y += yi;
        sum_xy += xi * yi;
        sum_x2 += xi * xi;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Root mean square error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return 0.0;
    }
    let mse = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

/// Mean absolute percentage error, in percent.
///
/// Zero actuals contribute nothing to the sum but still count toward `n`.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .sum();
    sum / actual.len() as f64 * 100.0
}

/// Coefficient of determination. 0.0 when the actual series has no spread.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return 0.0;
    }
    let mean_actual = mean(actual);
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot.abs() < EPSILON {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Min-max scale into [0, 1]; a constant series maps to zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Z-score standardization with population standard deviation.
pub fn z_score_standardize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let m = mean(values);
    let sd = std_dev(values);
    if sd == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / sd).collect()
}

/// Qualitative strength of a correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Strong,   // |r| > 0.7
    Moderate, // |r| > 0.4
    Weak,
}

/// Sign of a correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationDirection {
    Positive,
    Negative,
}

/// Correlation coefficient with its qualitative reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSummary {
    pub correlation: f64,
    pub strength: CorrelationStrength,
    pub direction: CorrelationDirection,
}

impl CorrelationSummary {
    pub fn from_coefficient(correlation: f64) -> Self {
        let magnitude = correlation.abs();
        let strength = if magnitude > 0.7 {
            CorrelationStrength::Strong
        } else if magnitude > 0.4 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        };
        let direction = if correlation > 0.0 {
            CorrelationDirection::Positive
        } else {
            CorrelationDirection::Negative
        };
        Self {
            correlation,
            strength,
            direction,
        }
    }

    /// Correlate two series and classify the result.
    pub fn between(x: &[f64], y: &[f64]) -> Self {
        Self::from_coefficient(pearson_correlation(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_pearson_perfect_positive() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert_eq!(r, 1.0);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[8.0, 6.0, 4.0, 2.0]);
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[rstest]
    #[case(&[], &[])]
    #[case(&[1.0, 2.0], &[1.0])]
    #[case(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0])]
    #[case(&[1.0, 2.0, 3.0], &[7.0, 7.0, 7.0])]
    fn test_pearson_neutral_cases(#[case] x: &[f64], #[case] y: &[f64]) {
        assert_eq!(pearson_correlation(x, y), 0.0);
    }

    #[test]
    fn test_linear_slope() {
        // load = 120 * t + 500
        let t = vec![10.0, 15.0, 20.0, 25.0];
        let load: Vec<f64> = t.iter().map(|x| 120.0 * x + 500.0).collect();
        assert!((linear_slope(&t, &load) - 120.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(&[1.0], &[2.0])]
    #[case(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0])]
    #[case(&[1.0, 2.0], &[1.0])]
    fn test_linear_slope_neutral_cases(#[case] x: &[f64], #[case] y: &[f64]) {
        assert_eq!(linear_slope(x, y), 0.0);
    }

    #[test]
    fn test_error_metrics_perfect_fit() {
        let actual = vec![100.0, 200.0, 300.0];
        assert_eq!(rmse(&actual, &actual), 0.0);
        assert_eq!(mape(&actual, &actual), 0.0);
        assert_eq!(r_squared(&actual, &actual), 1.0);
    }

    #[test]
    fn test_error_metrics_values() {
        let actual = vec![100.0, 200.0];
        let predicted = vec![110.0, 180.0];
        // sqrt((100 + 400) / 2)
        assert!((rmse(&actual, &predicted) - 250.0_f64.sqrt()).abs() < 1e-12);
        // (0.1 + 0.1) / 2 * 100
        assert!((mape(&actual, &predicted) - 10.0).abs() < 1e-12);
        // ss_tot = 5000, ss_res = 500
        assert!((r_squared(&actual, &predicted) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_mape_skips_zero_actuals_but_counts_them() {
        let actual = vec![0.0, 100.0];
        let predicted = vec![5.0, 150.0];
        assert!((mape(&actual, &predicted) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_error_metrics_neutral_on_bad_input() {
        assert_eq!(rmse(&[], &[]), 0.0);
        assert_eq!(mape(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(r_squared(&[], &[]), 0.0);
        assert_eq!(r_squared(&[4.0, 4.0], &[3.0, 5.0]), 0.0);
    }

    #[test]
    fn test_min_max_normalize() {
        assert_eq!(min_max_normalize(&[2.0, 4.0, 6.0]), vec![0.0, 0.5, 1.0]);
        assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![0.0, 0.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn test_z_score_standardize() {
        let z = z_score_standardize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        // mean 5, population std 2
        assert_eq!(z[0], -1.5);
        assert_eq!(z[7], 2.0);
        assert_eq!(z_score_standardize(&[1.0, 1.0]), vec![0.0, 0.0]);
    }

    #[rstest]
    #[case(0.85, CorrelationStrength::Strong, CorrelationDirection::Positive)]
    #[case(-0.5, CorrelationStrength::Moderate, CorrelationDirection::Negative)]
    #[case(0.4, CorrelationStrength::Weak, CorrelationDirection::Positive)]
    #[case(0.0, CorrelationStrength::Weak, CorrelationDirection::Negative)]
    fn test_correlation_summary(
        #[case] r: f64,
        #[case] strength: CorrelationStrength,
        #[case] direction: CorrelationDirection,
    ) {
        let summary = CorrelationSummary::from_coefficient(r);
        assert_eq!(summary.strength, strength);
        assert_eq!(summary.direction, direction);
    }
}
