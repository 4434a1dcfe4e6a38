//! Fixed feature schema shared by feature engineering, the forest and the forecaster.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

/// Name of a single feature column.
///
/// Declaration order is the schema order. Split search, importance scoring and
/// normalization all walk the columns in this order, so tie-breaking is stable.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FeatureName {
    Temperature,
    Humidity,
    #[serde(rename = "thermalMomentum3h")]
    #[strum(serialize = "thermalMomentum3h")]
    ThermalMomentum3h,
    #[serde(rename = "thermalMomentum24h")]
    #[strum(serialize = "thermalMomentum24h")]
    ThermalMomentum24h,
    HourOfDay,
    DayOfWeek,
    DayOfYear,
    IsBusinessHour,
    IsPeakHour,
    IsWeekend,
    TemperatureSin,
    TemperatureCos,
    HourSin,
    HourCos,
    MonthSin,
    MonthCos,
}

impl FeatureName {
    /// All schema columns in order.
    pub fn all() -> Vec<FeatureName> {
        FeatureName::iter().collect()
    }
}

/// One row of model input. Booleans are stored as 0.0 / 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "thermalMomentum3h")]
    pub thermal_momentum_3h: f64,
    #[serde(rename = "thermalMomentum24h")]
    pub thermal_momentum_24h: f64,
    pub hour_of_day: f64,
    pub day_of_week: f64,
    pub day_of_year: f64,
    pub is_business_hour: f64,
    pub is_peak_hour: f64,
    pub is_weekend: f64,
    pub temperature_sin: f64,
    pub temperature_cos: f64,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
}

impl FeatureVector {
    pub fn get(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::Temperature => self.temperature,
            FeatureName::Humidity => self.humidity,
            FeatureName::ThermalMomentum3h => self.thermal_momentum_3h,
            FeatureName::ThermalMomentum24h => self.thermal_momentum_24h,
            FeatureName::HourOfDay => self.hour_of_day,
            FeatureName::DayOfWeek => self.day_of_week,
            FeatureName::DayOfYear => self.day_of_year,
            FeatureName::IsBusinessHour => self.is_business_hour,
            FeatureName::IsPeakHour => self.is_peak_hour,
            FeatureName::IsWeekend => self.is_weekend,
            FeatureName::TemperatureSin => self.temperature_sin,
            FeatureName::TemperatureCos => self.temperature_cos,
            FeatureName::HourSin => self.hour_sin,
            FeatureName::HourCos => self.hour_cos,
            FeatureName::MonthSin => self.month_sin,
            FeatureName::MonthCos => self.month_cos,
        }
    }

    pub fn set(&mut self, name: FeatureName, value: f64) {
        let slot = match name {
            FeatureName::Temperature => &mut self.temperature,
            FeatureName::Humidity => &mut self.humidity,
            FeatureName::ThermalMomentum3h => &mut self.thermal_momentum_3h,
            FeatureName::ThermalMomentum24h => &mut self.thermal_momentum_24h,
            FeatureName::HourOfDay => &mut self.hour_of_day,
            FeatureName::DayOfWeek => &mut self.day_of_week,
            FeatureName::DayOfYear => &mut self.day_of_year,
            FeatureName::IsBusinessHour => &mut self.is_business_hour,
            FeatureName::IsPeakHour => &mut self.is_peak_hour,
            FeatureName::IsWeekend => &mut self.is_weekend,
            FeatureName::TemperatureSin => &mut self.temperature_sin,
            FeatureName::TemperatureCos => &mut self.temperature_cos,
            FeatureName::HourSin => &mut self.hour_sin,
            FeatureName::HourCos => &mut self.hour_cos,
            FeatureName::MonthSin => &mut self.month_sin,
            FeatureName::MonthCos => &mut self.month_cos,
        };
        *slot = value;
    }

    /// Extract one column from a slice of vectors.
    pub fn column(features: &[FeatureVector], name: FeatureName) -> Vec<f64> {
        features.iter().map(|f| f.get(name)).collect()
    }
}
