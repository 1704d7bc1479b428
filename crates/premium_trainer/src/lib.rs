//! Premium trainer - histogram GBDT and hyperparameter search
//!
//! Fits a squared-error gradient boosted tree ensemble on the feature matrix
//! produced by `premium_core`, choosing its hyperparameters by
//! cross-validated random search over a fixed space.

pub mod binning;
pub mod cart;
pub mod errors;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod search;
pub mod trainer;
pub mod tree;

pub use errors::{Result, TrainerError};
pub use metrics::TargetTransform;
pub use report::PredictionSummary;
pub use runner::{PremiumPipeline, RefitMetrics, RunPaths, RunReport, TrainedPipeline};
pub use search::{KFold, SearchDriver, SearchOutcome, SearchSpace, TrialResult};
pub use trainer::{BoosterParams, GbdtModel, GbdtTrainer, Regressor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
