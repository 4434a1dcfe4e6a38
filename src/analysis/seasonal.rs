//! Additive seasonal decomposition
//!
//! `original = trend + seasonal + residual`, with the trend taken from a
//! centered moving average and the seasonal component as the per-phase mean
//! of the detrended series.

use serde::{Deserialize, Serialize};

/// Default period for hourly load data (one day)
pub const DEFAULT_PERIOD_HOURS: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalDecomposition {
    pub original: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

/// Centered moving average.
///
/// The window for index `i` covers `[i - floor(w/2), i + ceil(w/2))`, clipped
/// to the series, so edge points average over fewer values.
pub fn moving_average(data: &[f64], window_size: usize) -> Vec<f64> {
    let window_size = window_size.max(1);
    let back = window_size / 2;
    let forward = window_size.div_ceil(2);

    (0..data.len())
        .map(|i| {
            let start = i.saturating_sub(back);
            let end = (i + forward).min(data.len());
            let window = &data[start..end];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Decompose `data` into trend, seasonal and residual components.
///
/// A `period` of zero is treated as one.
pub fn seasonal_decompose(data: &[f64], period: usize) -> SeasonalDecomposition {
    let period = period.max(1);
    let trend = moving_average(data, period);
    let detrended: Vec<f64> = data.iter().zip(trend.iter()).map(|(v, t)| v - t).collect();

    let mut seasonal = vec![0.0; data.len()];
    for phase in 0..period.min(data.len()) {
        let (sum, count) = detrended
            .iter()
            .skip(phase)
            .step_by(period)
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        let phase_mean = sum / count as f64;
        for slot in seasonal.iter_mut().skip(phase).step_by(period) {
            *slot = phase_mean;
        }
    }

    let residual = data
        .iter()
        .zip(trend.iter().zip(seasonal.iter()))
        .map(|(v, (t, s))| v - t - s)
        .collect();

    SeasonalDecomposition {
        original: data.to_vec(),
        trend,
        seasonal,
        residual,
    }
}

/// Seasonally adjusted series: trend + residual (the seasonal term is dropped).
pub fn recompose(decomposition: &SeasonalDecomposition) -> Vec<f64> {
    decomposition
        .trend
        .iter()
        .zip(decomposition.residual.iter())
        .map(|(t, r)| t + r)
        .collect()
}
