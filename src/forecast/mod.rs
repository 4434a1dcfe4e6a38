//! Feature engineering and multi-step forecasting on top of a trained forest

pub mod engine;
pub mod features;
pub mod metrics;

pub use engine::*;
pub use features::*;
pub use metrics::*;
