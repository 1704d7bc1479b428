//! Run reporting: logged summaries and the predictions CSV

use premium_core::schema::{ID_HEADER, TARGET_HEADER};
use premium_core::{PremiumError, Table};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::{Result, TrainerError};
use crate::search::{SearchOutcome, TrialOutcome};
use crate::trainer::GbdtModel;

/// Log the missing-value percentage of every column
pub fn log_missing_report(label: &str, table: &Table) {
    info!("Missing values in {} ({} rows):", label, table.len());
    for summary in table.missing_report() {
        info!(
            "  {:<22} {:>8} ({:.2}%)",
            summary.column, summary.missing, summary.percent
        );
    }
}

/// Log every trial in rank order with its fold scores
pub fn log_trials(outcome: &SearchOutcome) {
    info!(
        "Search results ({} trials, {} failed):",
        outcome.trials.len(),
        outcome.failed_count()
    );
    info!(
        "  {:>4} {:>5} {:>12} {:>10} {:>12}  params",
        "rank", "trial", "mean_test", "std_test", "mean_train"
    );
    for trial in outcome.ranked() {
        match &trial.outcome {
            TrialOutcome::Scored(s) => {
                info!(
                    "  {:>4} {:>5} {:>12.6} {:>10.6} {:>12.6}  {}",
                    trial.rank,
                    trial.index + 1,
                    s.mean_test,
                    s.std_test,
                    s.mean_train,
                    trial.candidate.summary()
                );
                let folds: Vec<String> = s.test.iter().map(|v| format!("{:.6}", v)).collect();
                info!("         folds: [{}]", folds.join(", "));
            }
            TrialOutcome::Failed { reason, .. } => info!(
                "  {:>4} {:>5} {:>12} {:>10} {:>12}  {} ({})",
                trial.rank,
                trial.index + 1,
                "failed",
                "-",
                "-",
                trial.candidate.summary(),
                reason
            ),
        }
    }
}

/// First `n` features by split count
pub fn top_features(model: &GbdtModel, n: usize) -> Vec<(String, u64)> {
    let mut ranked = model.feature_importance();
    ranked.truncate(n);
    ranked
}

pub fn log_feature_importance(model: &GbdtModel, n: usize) {
    info!("Feature importance (split count), top {}:", n);
    for (i, (name, weight)) in top_features(model, n).iter().enumerate() {
        info!("  {:>2}. {:<28} {}", i + 1, name, weight);
    }
}

/// Range and mean of a prediction vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Predictions at or below zero
    pub non_positive: usize,
}

impl PredictionSummary {
    pub fn from_predictions(predictions: &[f64]) -> Self {
        let count = predictions.len();
        let min = predictions.iter().copied().fold(f64::INFINITY, f64::min);
        let max = predictions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = if count == 0 {
            f64::NAN
        } else {
            predictions.iter().sum::<f64>() / count as f64
        };
        Self {
            count,
            min,
            max,
            mean,
            non_positive: predictions.iter().filter(|&&p| p <= 0.0).count(),
        }
    }

    pub fn log(&self, label: &str) {
        info!(
            "{} predictions: n={} min={:.4} max={:.4} mean={:.4}",
            label, self.count, self.min, self.max, self.mean
        );
        if self.non_positive > 0 {
            warn!(
                "{} {} predictions are not positive",
                self.non_positive, label
            );
        }
    }
}

/// Write `id,Premium Amount` rows
pub fn write_predictions<P: AsRef<Path>>(path: P, ids: &[String], predictions: &[f64]) -> Result<()> {
    if ids.len() != predictions.len() {
        return Err(TrainerError::InvalidTarget(format!(
            "{} ids for {} predictions",
            ids.len(),
            predictions.len()
        )));
    }
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(PremiumError::from)?;
    writer
        .write_record([ID_HEADER, TARGET_HEADER])
        .map_err(PremiumError::from)?;
    for (id, value) in ids.iter().zip(predictions) {
        writer
            .write_record([id.as_str(), value.to_string().as_str()])
            .map_err(PremiumError::from)?;
    }
    writer.flush().map_err(PremiumError::from)?;
    info!("Wrote {} predictions to {}", predictions.len(), path.display());
    Ok(())
}
