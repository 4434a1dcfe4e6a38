//! Heating and cooling degree days

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::Observation;

/// Conventional comfort base temperature (°C), equivalent to 65°F
pub const DEFAULT_BASE_TEMPERATURE_C: f64 = 18.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeDays {
    /// Heating degree days
    pub hdd: f64,
    /// Cooling degree days
    pub cdd: f64,
}

/// Degree days for one day from its extreme temperatures.
///
/// HDD = max(base - avg, 0), CDD = max(avg - base, 0) where
/// avg = (max + min) / 2. At most one of the two is non-zero.
pub fn degree_days(max_temp: f64, min_temp: f64, base_temperature: f64) -> DegreeDays {
    let avg_temp = (max_temp + min_temp) / 2.0;
    DegreeDays {
        hdd: (base_temperature - avg_temp).max(0.0),
        cdd: (avg_temp - base_temperature).max(0.0),
    }
}

/// Degree days for one calendar day of observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyDegreeDays {
    pub date: NaiveDate,
    pub max_temp: f64,
    pub min_temp: f64,
    pub degree_days: DegreeDays,
}

/// Group consecutive observations by local calendar date and compute each
/// day's degree days from its observed temperature extremes.
pub fn daily_degree_days(
    observations: &[Observation],
    base_temperature: f64,
) -> Vec<DailyDegreeDays> {
    observations
        .iter()
        .chunk_by(|o| o.timestamp.date_naive())
        .into_iter()
        .map(|(date, day)| {
            let (min_temp, max_temp) = day.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
                (lo.min(o.temperature), hi.max(o.temperature))
            });
            DailyDegreeDays {
                date,
                max_temp,
                min_temp,
                degree_days: degree_days(max_temp, min_temp, base_temperature),
            }
        })
        .collect()
}
