//! Fold scoring; higher is better

use crate::errors::Result;
use crate::metrics;

pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, y_true: &[f64], y_pred: &[f64]) -> Result<f64>;
}

/// Negated mean squared log error. Fails when either side holds a
/// negative value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegMeanSquaredLogError;

impl Scorer for NegMeanSquaredLogError {
    fn name(&self) -> &'static str {
        "neg_mean_squared_log_error"
    }

    fn score(&self, y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Ok(-metrics::msle(y_true, y_pred)?)
    }
}
