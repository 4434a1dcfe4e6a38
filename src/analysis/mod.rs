//! Statistical analysis of weather/load series
//!
//! - Heating/cooling degree days
//! - Correlation, elasticity and error metrics
//! - Heating vs cooling regime analysis
//! - Additive seasonal decomposition

pub mod degree_days;
pub mod regime;
pub mod seasonal;
pub mod statistics;

pub use degree_days::*;
pub use regime::*;
pub use seasonal::*;
pub use statistics::*;
