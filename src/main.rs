use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loadcast::analysis::{
    daily_degree_days, optimize_base_temperature, regime_analysis, seasonal_decompose,
    BaseTemperatureFit, CorrelationSummary, DailyDegreeDays, HingeProfile, RegimeAnalysis,
};
use loadcast::config::{Config, DEFAULT_CONFIG_PATH};
use loadcast::domain::{temperature_and_load, Observation};
use loadcast::forecast::{
    build_feature_vectors, build_training_data, detect_anomalies, score_feature_importance,
    FeatureImportance, ForecastEngine,
};
use loadcast::ml::{deserialize_model, serialize_model, ModelTrainer};
use loadcast::telemetry::init_tracing;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Weather-driven load analysis and forecasting",
    long_about = None
)]
struct Cli {
    /// Configuration file (overridden by LOADCAST__* environment variables)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Seed for reproducible runs; overrides `random_seed` from the config
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a forest on observations and write the model as JSON
    Train {
        /// JSON array of observations, oldest first
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        num_trees: Option<usize>,
    },
    /// k-fold cross-validation report
    CrossValidate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        folds: Option<usize>,
        #[arg(long)]
        num_trees: Option<usize>,
    },
    /// Search the forest size with 3-fold cross-validation
    GridSearch {
        #[arg(long)]
        input: PathBuf,
        /// Comma-separated tree counts, e.g. 5,10,20
        #[arg(long, value_delimiter = ',')]
        options: Vec<usize>,
    },
    /// Forecast from the latest observations with a saved model
    Forecast {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Degree days, heating/cooling regimes and seasonality of observations
    Analyze {
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReport {
    observations: usize,
    daily_degree_days: Vec<DailyDegreeDays>,
    correlation: CorrelationSummary,
    regimes: RegimeAnalysis,
    base_temperature_fit: BaseTemperatureFit,
    /// Mean absolute seasonal swing over one period
    seasonal_amplitude: f64,
    anomaly_count: usize,
    feature_importance: Vec<FeatureImportance>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;
    let seed = cli.seed.or(cfg.random_seed);
    if seed.is_none() {
        info!("no random seed configured; results will vary between runs");
    }

    match cli.command {
        Command::Train { input, output, num_trees } => {
            let data = build_training_data(&read_observations(&input)?)?;
            let mut trainer = ModelTrainer::with_seed(cfg.training_config(), seed)?;
            let trained = trainer.train_model(&data, num_trees.unwrap_or(cfg.forest.num_trees))?;
            let limits = &cfg.training;
            if !trained.metrics.meets_quality_threshold(limits.max_mape, limits.min_r_squared) {
                warn!(
                    mape = trained.metrics.mape,
                    r_squared = trained.metrics.r_squared,
                    max_mape = limits.max_mape,
                    min_r_squared = limits.min_r_squared,
                    "trained model is below the configured quality bounds"
                );
            }
            std::fs::write(&output, serialize_model(&trained)?)
                .with_context(|| format!("writing model to {}", output.display()))?;
            info!(model_id = %trained.model_id, path = %output.display(), "model saved");
            print_json(&trained.metrics)
        }
        Command::CrossValidate { input, folds, num_trees } => {
            let data = build_training_data(&read_observations(&input)?)?;
            let mut trainer = ModelTrainer::with_seed(cfg.training_config(), seed)?;
            let result = trainer.k_fold_cross_validation(
                &data,
                folds.unwrap_or(cfg.training.cv_folds),
                num_trees.unwrap_or(cfg.forest.num_trees),
            )?;
            print_json(&result)
        }
        Command::GridSearch { input, options } => {
            let data = build_training_data(&read_observations(&input)?)?;
            let options = if options.is_empty() {
                cfg.training.num_trees_options.clone()
            } else {
                options
            };
            let mut trainer = ModelTrainer::with_seed(cfg.training_config(), seed)?;
            print_json(&trainer.grid_search_hyperparameters(&data, &options)?)
        }
        Command::Forecast { model, input, steps } => {
            let json = std::fs::read_to_string(&model)
                .with_context(|| format!("reading model from {}", model.display()))?;
            let trained = deserialize_model(&json)?;
            let features = build_feature_vectors(&read_observations(&input)?);
            let mut engine = ForecastEngine::with_seed(cfg.forecast.clone(), seed);
            let steps = steps.unwrap_or(cfg.forecast.steps);
            let forecast = engine.make_forecast(&trained.model, &features, steps)?;
            print_json(&forecast)
        }
        Command::Analyze { input } => {
            let observations = read_observations(&input)?;
            print_json(&analyze(&observations, &cfg))
        }
    }
}

fn analyze(observations: &[Observation], cfg: &Config) -> AnalysisReport {
    let analysis = &cfg.analysis;
    let (temperatures, loads) = temperature_and_load(observations);
    let decomposition = seasonal_decompose(&loads, analysis.seasonal_period);
    let period = analysis.seasonal_period.min(loads.len()).max(1);
    let seasonal_amplitude =
        decomposition.seasonal.iter().take(period).map(|s| s.abs()).sum::<f64>() / period as f64;

    let anomaly_count =
        detect_anomalies(&loads, analysis.anomaly_window, analysis.anomaly_threshold)
            .into_iter()
            .filter(|&flagged| flagged)
            .count();
    if anomaly_count > 0 {
        warn!(anomaly_count, "anomalous load readings detected");
    }

    let features = build_feature_vectors(observations);

    AnalysisReport {
        observations: observations.len(),
        daily_degree_days: daily_degree_days(observations, analysis.base_temperature),
        correlation: CorrelationSummary::between(&temperatures, &loads),
        regimes: regime_analysis(&temperatures, &loads, analysis.base_temperature),
        base_temperature_fit: optimize_base_temperature(
            &temperatures,
            &loads,
            analysis.base_search_min,
            analysis.base_search_max,
            analysis.base_search_step,
            &HingeProfile::default(),
        ),
        seasonal_amplitude,
        anomaly_count,
        feature_importance: score_feature_importance(&features, &loads),
    }
}

fn read_observations(path: &Path) -> Result<Vec<Observation>> {
    let file =
        File::open(path).with_context(|| format!("opening observations {}", path.display()))?;
    let observations: Vec<Observation> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing observations {}", path.display()))?;
    info!(count = observations.len(), path = %path.display(), "observations loaded");
    Ok(observations)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
