//! End-to-end training run
//!
//! Load the labeled file, fit preprocessing, search and refit the booster,
//! then score the optional unlabeled file with the same fitted state.

use premium_core::{Dataset, FittedPreprocessor, PipelineConfig, Preprocessor, Table};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use crate::errors::Result;
use crate::metrics::{self, TargetTransform};
use crate::report::{self, PredictionSummary};
use crate::search::{KFold, SearchDriver, SearchOutcome, SearchSpace};
use crate::trainer::{BoosterParams, GbdtTrainer};

/// Input and output paths of one run
#[derive(Debug, Clone, Default)]
pub struct RunPaths {
    pub train: PathBuf,
    pub test: Option<PathBuf>,
    pub predictions: Option<PathBuf>,
}

/// Fit quality of the refitted model on its own training rows
#[derive(Debug, Clone, PartialEq)]
pub struct RefitMetrics {
    /// RMSE in log1p space, i.e. RMSLE on the currency scale
    pub rmsle: f64,
    /// RMSE in currency units
    pub rmse: f64,
    /// Prediction range on the currency scale
    pub min_prediction: f64,
    pub max_prediction: f64,
    /// Currency-scale predictions at or below zero
    pub non_positive_predictions: usize,
}

impl RefitMetrics {
    /// Compare log-space predictions with the log targets and, after the
    /// inverse transform, with the raw premiums
    pub fn compute(
        transform: TargetTransform,
        target: &[f64],
        y: &[f64],
        fitted: &[f64],
    ) -> Result<Self> {
        let currency = transform.inverse(fitted);
        let summary = PredictionSummary::from_predictions(&currency);
        if summary.non_positive > 0 {
            warn!(
                "{} refit predictions are zero or negative",
                summary.non_positive
            );
        }
        Ok(Self {
            rmsle: metrics::rmse(y, fitted)?,
            rmse: metrics::rmse(target, &currency)?,
            min_prediction: summary.min,
            max_prediction: summary.max,
            non_positive_predictions: summary.non_positive,
        })
    }
}

/// Fitted preprocessing plus the selected model
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    pub preprocessor: FittedPreprocessor,
    pub search: SearchOutcome,
    pub transform: TargetTransform,
    pub refit: RefitMetrics,
}

impl TrainedPipeline {
    /// Predict premiums (currency scale) for new rows
    pub fn predict(&self, table: &Table) -> Result<Vec<f64>> {
        let x = self.preprocessor.transform(table)?;
        let raw = self.search.model.predict(&x)?;
        Ok(self.transform.inverse(&raw))
    }
}

/// Everything a run reports
#[derive(Debug, Clone)]
pub struct RunReport {
    pub rows: usize,
    pub features: usize,
    pub trained: TrainedPipeline,
    pub importance: Vec<(String, u64)>,
    pub test_summary: Option<PredictionSummary>,
    pub fingerprint: String,
}

/// Training run driven by a [`PipelineConfig`]
pub struct PremiumPipeline {
    config: PipelineConfig,
    space: SearchSpace,
}

impl PremiumPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            space: SearchSpace::premium_default(),
        }
    }

    /// Replace the default search space
    pub fn with_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Booster settings that the search does not vary
    pub fn base_params(&self) -> BoosterParams {
        BoosterParams {
            max_bin: self.config.booster.max_bin,
            min_child_weight: self.config.booster.min_child_weight,
            seed: self.config.search.seed,
            ..Default::default()
        }
    }

    fn preprocessor(&self) -> Preprocessor {
        let processing = self
            .config
            .processing_date
            .and_then(|d| d.and_hms_opt(0, 0, 0));
        Preprocessor::new(processing)
    }

    /// Fit preprocessing and run the search on a labeled dataset
    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub fn train(&self, dataset: &Dataset) -> Result<TrainedPipeline> {
        let target = dataset.require_target()?;
        let non_positive = dataset.non_positive_targets();
        if non_positive > 0 {
            warn!("{} target values are zero or negative", non_positive);
        }

        let transform = TargetTransform::Log1p;
        let y = transform.forward(target)?;

        let (preprocessor, x) = self.preprocessor().fit_transform(&dataset.features)?;

        let driver = SearchDriver::new(
            GbdtTrainer::new(),
            self.space.clone(),
            self.base_params(),
            KFold::new(self.config.search.folds)?,
            self.config.search.iterations,
        );
        let search = driver.run(&x, &y)?;

        let fitted = search.model.predict(&x)?;
        let refit = RefitMetrics::compute(transform, target, &y, &fitted)?;

        Ok(TrainedPipeline {
            preprocessor,
            search,
            transform,
            refit,
        })
    }

    /// Full run: train, report, and score the test file when given
    pub fn run(&self, paths: &RunPaths) -> Result<RunReport> {
        let dataset = Dataset::from_csv(&paths.train)?;
        report::log_missing_report("train", &dataset.features);
        info!(
            "Train shape: {} rows x {} columns",
            dataset.len(),
            dataset.features.columns().len()
        );

        let trained = self.train(&dataset)?;
        let outcome = &trained.search;

        report::log_trials(outcome);
        info!("Best cross-validated score: {:.6}", outcome.best_score());
        info!("Best configuration: {}", outcome.best().candidate.summary());
        info!("Refit RMSLE: {:.6}", trained.refit.rmsle);
        info!("Refit RMSE: {:.4}", trained.refit.rmse);
        info!(
            "Refit predictions (currency scale): min={:.4} max={:.4}",
            trained.refit.min_prediction, trained.refit.max_prediction
        );

        let top = self.config.report.top_features;
        report::log_feature_importance(&outcome.model, top);
        let importance = report::top_features(&outcome.model, top);

        let test_summary = match &paths.test {
            Some(path) => {
                let test = Dataset::from_csv(path)?;
                report::log_missing_report("test", &test.features);
                info!(
                    "Test shape: {} rows x {} columns",
                    test.len(),
                    test.features.columns().len()
                );
                let predictions = trained.predict(&test.features)?;
                let summary = PredictionSummary::from_predictions(&predictions);
                summary.log("test");
                if let Some(out) = &paths.predictions {
                    report::write_predictions(out, &test.ids, &predictions)?;
                }
                Some(summary)
            }
            None => {
                if paths.predictions.is_some() {
                    warn!("Predictions path ignored: no test file given");
                }
                None
            }
        };

        let fingerprint = outcome.model.fingerprint()?;
        let features = outcome.model.n_features();
        Ok(RunReport {
            rows: dataset.len(),
            features,
            trained,
            importance,
            test_summary,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refit_metrics_count_non_positive_predictions() -> anyhow::Result<()> {
        let target = [100.0, 200.0, 0.0];
        let y = TargetTransform::Log1p.forward(&target)?;
        // expm1(-1) is below zero
        let fitted = [y[0], y[1], -1.0];
        let refit = RefitMetrics::compute(TargetTransform::Log1p, &target, &y, &fitted)?;

        assert_eq!(refit.non_positive_predictions, 1);
        assert!(refit.min_prediction < 0.0);
        assert!((refit.max_prediction - 200.0).abs() < 1e-9);
        assert!((refit.rmsle - (1.0f64 / 3.0).sqrt()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_refit_metrics_exact_fit() -> anyhow::Result<()> {
        let target = [150.0, 900.0];
        let y = TargetTransform::Log1p.forward(&target)?;
        let refit = RefitMetrics::compute(TargetTransform::Log1p, &target, &y, &y)?;
        assert_eq!(refit.rmsle, 0.0);
        assert!(refit.rmse < 1e-9);
        assert_eq!(refit.non_positive_predictions, 0);
        Ok(())
    }
}
