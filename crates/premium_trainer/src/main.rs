//! Premium trainer CLI
//!
//! Fits the preprocessing chain and searches booster hyperparameters on a
//! labeled policy file, then optionally scores an unlabeled one.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use premium_core::PipelineConfig;
use premium_trainer::{PremiumPipeline, RunPaths};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "premium-train")]
#[command(author = "Premium Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Insurance premium regression trainer", long_about = None)]
struct Args {
    /// Labeled CSV (id, feature columns, Premium Amount)
    #[arg(long)]
    train: PathBuf,

    /// Unlabeled CSV to score with the selected model
    #[arg(long)]
    test: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of sampled configurations
    #[arg(long)]
    iterations: Option<usize>,

    /// Cross-validation folds
    #[arg(long)]
    folds: Option<usize>,

    /// Seed for configuration sampling and booster subsampling
    #[arg(long)]
    seed: Option<u64>,

    /// Reference date for customer tenure (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    processing_date: Option<NaiveDate>,

    /// Number of features listed in the importance ranking
    #[arg(long)]
    top_features: Option<usize>,

    /// Write test predictions as `id,Premium Amount` CSV
    #[arg(long)]
    predictions: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("{}: {}", value, e))
}

impl Args {
    fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(iterations) = self.iterations {
            config.search.iterations = iterations;
        }
        if let Some(folds) = self.folds {
            config.search.folds = folds;
        }
        if let Some(seed) = self.seed {
            config.search.seed = seed;
        }
        if let Some(date) = self.processing_date {
            config.processing_date = Some(date);
        }
        if let Some(top) = self.top_features {
            config.report.top_features = top;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.apply_env_overrides();
    args.apply_to(&mut config);

    // RUST_LOG wins, then the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Premium Trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");

    let warnings = config.validate().context("Invalid configuration")?;
    for warning in &warnings {
        warn!("Config: {}", warning);
    }

    info!("Run configuration:");
    info!("  Iterations: {}", config.search.iterations);
    info!("  Folds: {}", config.search.folds);
    info!("  Seed: {}", config.search.seed);
    info!("  Max bins: {}", config.booster.max_bin);
    info!("  Min child weight: {}", config.booster.min_child_weight);
    match config.processing_date {
        Some(date) => info!("  Processing date: {}", date),
        None => info!("  Processing date: now"),
    }

    let paths = RunPaths {
        train: args.train.clone(),
        test: args.test.clone(),
        predictions: args.predictions.clone(),
    };

    info!("═══════════════════════════════════════════");
    let report = PremiumPipeline::new(config)
        .run(&paths)
        .context("Training run failed")?;

    info!("═══════════════════════════════════════════");
    info!("✓ Training completed successfully");
    info!("  Rows: {}", report.rows);
    info!("  Features: {}", report.features);
    info!("  Trees: {}", report.trained.search.model.trees.len());
    info!("  Refit RMSLE: {:.6}", report.trained.refit.rmsle);
    info!("  Model fingerprint: {}", report.fingerprint);
    if let Some(summary) = &report.test_summary {
        info!("  Test rows scored: {}", summary.count);
    }

    Ok(())
}
