//! Weather-driven electricity load forecasting.
//!
//! Observations of temperature, humidity and load are turned into a fixed
//! feature schema, a random forest is trained on them, and the forest drives
//! hourly multi-step forecasts with per-step uncertainty.

pub mod analysis;
pub mod config;
pub mod domain;
pub mod forecast;
pub mod ml;
pub mod telemetry;
