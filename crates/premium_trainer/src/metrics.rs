//! Target transform and regression metrics

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrainerError};

/// Transform applied to the premium before fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetTransform {
    Identity,
    #[default]
    Log1p,
}

impl TargetTransform {
    /// Forward transform; a value the transform cannot represent is fatal
    pub fn forward(self, values: &[f64]) -> Result<Vec<f64>> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let t = match self {
                    TargetTransform::Identity => v,
                    TargetTransform::Log1p => v.ln_1p(),
                };
                if t.is_finite() {
                    Ok(t)
                } else {
                    Err(TrainerError::InvalidTarget(format!(
                        "row {} value {} has no finite {:?} transform",
                        i, v, self
                    )))
                }
            })
            .collect()
    }

    pub fn inverse(self, values: &[f64]) -> Vec<f64> {
        match self {
            TargetTransform::Identity => values.to_vec(),
            TargetTransform::Log1p => values.iter().map(|v| v.exp_m1()).collect(),
        }
    }
}

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(TrainerError::Scoring(format!(
            "{} targets vs {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(TrainerError::Scoring("no values to score".into()));
    }
    Ok(())
}

pub fn mse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (p - t).powi(2))
        .sum();
    Ok(sum / y_true.len() as f64)
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// Mean squared log error. Negative inputs are rejected.
pub fn msle(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if let Some(v) = y_true.iter().chain(y_pred).find(|v| **v < 0.0) {
        return Err(TrainerError::Scoring(format!(
            "mean squared log error is undefined for negative value {}",
            v
        )));
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (p.ln_1p() - t.ln_1p()).powi(2))
        .sum();
    Ok(sum / y_true.len() as f64)
}

pub fn rmsle(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    Ok(msle(y_true, y_pred)?.sqrt())
}
