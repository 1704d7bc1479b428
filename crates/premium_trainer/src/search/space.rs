//! Discrete hyperparameter search space

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrainerError};
use crate::trainer::BoosterParams;

/// `start + i * step` for every `i` with the value below `stop`
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || stop <= start {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil() as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Candidate values per hyperparameter, in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
    pub subsample: Vec<f64>,
    pub colsample_bytree: Vec<f64>,
    pub gamma: Vec<f64>,
    pub reg_lambda: Vec<f64>,
    pub reg_alpha: Vec<f64>,
}

impl SearchSpace {
    /// Grid used for premium models. The subsample and column-sample grids
    /// start at 0, which the booster rejects; those draws become failed
    /// trials.
    pub fn premium_default() -> Self {
        Self {
            n_estimators: (100..=1000).step_by(150).collect(),
            learning_rate: arange(0.05, 0.8, 0.05),
            max_depth: (3..=11).collect(),
            subsample: arange(0.0, 0.8, 0.1),
            colsample_bytree: arange(0.0, 0.8, 0.1),
            gamma: arange(0.0, 0.5, 0.05),
            reg_lambda: vec![0.0, 1.0, 10.0, 50.0],
            reg_alpha: vec![0.0, 1.0, 10.0, 50.0],
        }
    }

    /// Per-parameter value counts, in declaration order
    pub fn dimensions(&self) -> [usize; 8] {
        [
            self.n_estimators.len(),
            self.learning_rate.len(),
            self.max_depth.len(),
            self.subsample.len(),
            self.colsample_bytree.len(),
            self.gamma.len(),
            self.reg_lambda.len(),
            self.reg_alpha.len(),
        ]
    }

    /// Number of distinct configurations
    pub fn size(&self) -> usize {
        self.dimensions().iter().product()
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensions().contains(&0) {
            return Err(TrainerError::InvalidParameters(
                "every hyperparameter needs at least one candidate value".into(),
            ));
        }
        Ok(())
    }

    /// Configuration at one index per dimension
    pub fn candidate(&self, idx: [usize; 8]) -> Candidate {
        Candidate {
            n_estimators: self.n_estimators[idx[0]],
            learning_rate: self.learning_rate[idx[1]],
            max_depth: self.max_depth[idx[2]],
            subsample: self.subsample[idx[3]],
            colsample_bytree: self.colsample_bytree[idx[4]],
            gamma: self.gamma[idx[5]],
            reg_lambda: self.reg_lambda[idx[6]],
            reg_alpha: self.reg_alpha[idx[7]],
        }
    }
}

/// One sampled configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub gamma: f64,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
}

impl Candidate {
    /// Overlay the sampled values on fixed booster settings
    pub fn apply(&self, base: &BoosterParams) -> BoosterParams {
        BoosterParams {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            max_depth: self.max_depth,
            subsample: self.subsample,
            colsample_bytree: self.colsample_bytree,
            gamma: self.gamma,
            reg_lambda: self.reg_lambda,
            reg_alpha: self.reg_alpha,
            ..base.clone()
        }
    }

    /// Compact one-line form for logs and reports
    pub fn summary(&self) -> String {
        format!(
            "n_estimators={} learning_rate={:.2} max_depth={} subsample={:.1} colsample_bytree={:.1} gamma={:.2} reg_lambda={} reg_alpha={}",
            self.n_estimators,
            self.learning_rate,
            self.max_depth,
            self.subsample,
            self.colsample_bytree,
            self.gamma,
            self.reg_lambda,
            self.reg_alpha
        )
    }
}
