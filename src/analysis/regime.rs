//! Thermal regime analysis (heating vs cooling)
//!
//! Load responds to temperature differently on either side of a comfort base
//! temperature: below it heating drives consumption up as it gets colder,
//! above it cooling drives consumption up as it gets warmer. The functions
//! here measure that sensitivity separately for each side.

use serde::{Deserialize, Serialize};

use super::statistics::{linear_slope, pearson_correlation, r_squared};

/// Temperature band in which load was at its observed minimum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComfortZone {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAnalysis {
    pub base_temperature: f64,
    pub heating_correlation: f64,
    pub cooling_correlation: f64,
    /// Load change per degree below the base
    pub heating_slope: f64,
    /// Load change per degree above the base
    pub cooling_slope: f64,
    pub heating_samples: usize,
    pub cooling_samples: usize,
    /// `None` when there are no observations
    pub comfort_zone: Option<ComfortZone>,
}

/// Partition observations around `base_temp` and measure each regime.
///
/// Points exactly at the base belong to neither regime. The comfort zone is
/// the temperature span of every observation whose load equals the global
/// minimum load; this is only meaningful when those minima cluster near the
/// comfort temperature.
pub fn regime_analysis(temperatures: &[f64], loads: &[f64], base_temp: f64) -> RegimeAnalysis {
    let mut heating_temps = Vec::new();
    let mut heating_loads = Vec::new();
    let mut cooling_temps = Vec::new();
    let mut cooling_loads = Vec::new();

    for (&temp, &load) in temperatures.iter().zip(loads.iter()) {
        if temp < base_temp {
            heating_temps.push(temp);
            heating_loads.push(load);
        } else if temp > base_temp {
            cooling_temps.push(temp);
            cooling_loads.push(load);
        }
    }

    RegimeAnalysis {
        base_temperature: base_temp,
        heating_correlation: pearson_correlation(&heating_temps, &heating_loads),
        cooling_correlation: pearson_correlation(&cooling_temps, &cooling_loads),
        heating_slope: linear_slope(&heating_temps, &heating_loads),
        cooling_slope: linear_slope(&cooling_temps, &cooling_loads),
        heating_samples: heating_temps.len(),
        cooling_samples: cooling_temps.len(),
        comfort_zone: comfort_zone(temperatures, loads),
    }
}

fn comfort_zone(temperatures: &[f64], loads: &[f64]) -> Option<ComfortZone> {
    let min_load = loads
        .iter()
        .take(temperatures.len())
        .copied()
        .fold(f64::INFINITY, f64::min);

    temperatures
        .iter()
        .zip(loads.iter())
        .filter(|(_, load)| **load == min_load)
        .map(|(&temp, _)| temp)
        .fold(None, |zone: Option<ComfortZone>, temp| {
            Some(match zone {
                None => ComfortZone { min: temp, max: temp },
                Some(z) => ComfortZone {
                    min: z.min.min(temp),
                    max: z.max.max(temp),
                },
            })
        })
}

/// Piecewise-linear load profile used to score candidate base temperatures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HingeProfile {
    /// Load at the base temperature approached from the heating side
    pub heating_intercept: f64,
    /// Load change per degree below the base
    pub heating_rate: f64,
    /// Load at the base temperature approached from the cooling side
    pub cooling_intercept: f64,
    /// Load increase per degree above the base
    pub cooling_rate: f64,
}

impl Default for HingeProfile {
    fn default() -> Self {
        Self {
            heating_intercept: 3000.0,
            heating_rate: 100.0,
            cooling_intercept: 2000.0,
            cooling_rate: 120.0,
        }
    }
}

impl HingeProfile {
    pub fn predict(&self, temperature: f64, base_temp: f64) -> f64 {
        if temperature < base_temp {
            self.heating_intercept - (base_temp - temperature) * self.heating_rate
        } else {
            self.cooling_intercept + (temperature - base_temp) * self.cooling_rate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseTemperatureFit {
    pub base_temp: f64,
    pub r_squared: f64,
}

/// Scan base temperatures in `[min_temp, max_temp]` at `step` increments and
/// keep the one whose hinge profile best explains the loads (first wins ties).
pub fn optimize_base_temperature(
    temperatures: &[f64],
    loads: &[f64],
    min_temp: f64,
    max_temp: f64,
    step: f64,
    profile: &HingeProfile,
) -> BaseTemperatureFit {
    let mut best = BaseTemperatureFit {
        base_temp: min_temp,
        r_squared: f64::NEG_INFINITY,
    };
    if step <= 0.0 || max_temp < min_temp {
        return best;
    }

    let candidates = ((max_temp - min_temp) / step + 1e-9).floor() as usize;
    for i in 0..=candidates {
        let base_temp = min_temp + i as f64 * step;
        let predicted: Vec<f64> = temperatures
            .iter()
            .map(|&t| profile.predict(t, base_temp))
            .collect();
        let score = r_squared(loads, &predicted);
        if score > best.r_squared {
            best = BaseTemperatureFit {
                base_temp,
                r_squared: score,
            };
        }
    }
    best
}
