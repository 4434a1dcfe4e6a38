use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::analysis::{DEFAULT_BASE_TEMPERATURE_C, DEFAULT_PERIOD_HOURS};
use crate::forecast::{ForecastConfig, DEFAULT_ANOMALY_THRESHOLD, DEFAULT_ANOMALY_WINDOW};
use crate::ml::{
    TrainingConfig, DEFAULT_CV_FOLDS, DEFAULT_MAX_DEPTH, DEFAULT_NUM_TREES,
    DEFAULT_NUM_TREES_OPTIONS, DEFAULT_TRAIN_RATIO,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "LOADCAST__";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Fixed seed for every sampling step; entropy when unset
    pub random_seed: Option<u64>,
    #[validate(nested)]
    pub forest: ForestConfig,
    #[validate(nested)]
    pub training: TrainingSection,
    #[validate(nested)]
    pub forecast: ForecastConfig,
    #[validate(nested)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForestConfig {
    #[validate(range(min = 1))]
    pub num_trees: usize,
    pub max_depth: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            num_trees: DEFAULT_NUM_TREES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrainingSection {
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub train_ratio: f64,
    #[validate(range(min = 2))]
    pub cv_folds: usize,
    #[validate(length(min = 1))]
    pub num_trees_options: Vec<usize>,
    /// Held-out MAPE (percent) above which a trained model is reported as weak
    #[validate(range(min = 0.0))]
    pub max_mape: f64,
    /// Held-out R² below which a trained model is reported as weak
    pub min_r_squared: f64,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            train_ratio: DEFAULT_TRAIN_RATIO,
            cv_folds: DEFAULT_CV_FOLDS,
            num_trees_options: DEFAULT_NUM_TREES_OPTIONS.to_vec(),
            max_mape: 15.0,
            min_r_squared: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalysisConfig {
    pub base_temperature: f64,
    #[validate(range(min = 1))]
    pub seasonal_period: usize,
    #[validate(range(min = 1))]
    pub anomaly_window: usize,
    #[validate(range(exclusive_min = 0.0))]
    pub anomaly_threshold: f64,
    pub base_search_min: f64,
    pub base_search_max: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub base_search_step: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_temperature: DEFAULT_BASE_TEMPERATURE_C,
            seasonal_period: DEFAULT_PERIOD_HOURS,
            anomaly_window: DEFAULT_ANOMALY_WINDOW,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            base_search_min: 10.0,
            base_search_max: 25.0,
            base_search_step: 0.5,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `LOADCAST__*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        if cfg.analysis.base_search_min > cfg.analysis.base_search_max {
            anyhow::bail!(
                "analysis.base_search_min ({}) exceeds base_search_max ({})",
                cfg.analysis.base_search_min,
                cfg.analysis.base_search_max
            );
        }
        Ok(cfg)
    }

    /// Trainer settings assembled from the `forest` and `training` sections.
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            train_ratio: self.training.train_ratio,
            max_depth: self.forest.max_depth,
        }
    }
}
