use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One aligned weather/load sample.
///
/// Observation slices are expected in chronological order; nothing in the
/// crate reorders them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub timestamp: DateTime<FixedOffset>,
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Electricity load (kW)
    pub load: f64,
}

impl Observation {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        temperature: f64,
        humidity: f64,
        load: f64,
    ) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
            load,
        }
    }
}

/// Split observations into parallel temperature and load columns.
pub fn temperature_and_load(observations: &[Observation]) -> (Vec<f64>, Vec<f64>) {
    observations
        .iter()
        .map(|o| (o.temperature, o.load))
        .unzip()
}
