use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step of a multi-step load forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub timestamp: DateTime<Utc>,
    /// Mean of the per-tree predictions
    pub predicted: f64,
    /// 0.0 - 1.0, derived from tree disagreement relative to the prediction
    pub confidence: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastResult {
    /// Width of the uncertainty band.
    pub fn interval_width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_width() {
        let r = ForecastResult {
            timestamp: Utc::now(),
            predicted: 100.0,
            confidence: 0.9,
            lower_bound: 90.0,
            upper_bound: 110.0,
        };
        assert_eq!(r.interval_width(), 20.0);
    }
}
