//! Gradient Boosted Decision Tree (GBDT) regressor
//!
//! Squared-error boosting over quantile-binned features. Row and column
//! subsampling draw from a seeded `StdRng`, so a fixed seed reproduces the
//! same model.

use premium_core::FeatureMatrix;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binning::{BinMapper, MAX_BINS};
use crate::cart::{CartBuilder, TreeConfig};
use crate::errors::{Result, TrainerError};
use crate::tree::Tree;

/// Booster hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub subsample: f64,
    pub colsample_bytree: f64,
    /// Minimum gain required to keep a split
    pub gamma: f64,
    /// L2 regularisation on leaf weights
    pub reg_lambda: f64,
    /// L1 regularisation on leaf weights
    pub reg_alpha: f64,
    pub min_child_weight: f64,
    pub max_bin: usize,
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            subsample: 1.0,
            colsample_bytree: 1.0,
            gamma: 0.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            min_child_weight: 1.0,
            max_bin: 256,
            seed: 123,
        }
    }
}

impl BoosterParams {
    /// Reject values outside the regressor's domain
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TrainerError::InvalidParameters(msg));

        if self.n_estimators == 0 {
            return invalid("n_estimators must be at least 1".into());
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return invalid(format!("learning_rate must be > 0, got {}", self.learning_rate));
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be at least 1".into());
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid(format!("subsample must be in (0, 1], got {}", self.subsample));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return invalid(format!(
                "colsample_bytree must be in (0, 1], got {}",
                self.colsample_bytree
            ));
        }
        for (name, value) in [
            ("gamma", self.gamma),
            ("reg_lambda", self.reg_lambda),
            ("reg_alpha", self.reg_alpha),
            ("min_child_weight", self.min_child_weight),
        ] {
            if value.is_nan() || value < 0.0 {
                return invalid(format!("{} must be >= 0, got {}", name, value));
            }
        }
        if self.max_bin < 2 || self.max_bin > MAX_BINS {
            return invalid(format!("max_bin must be in [2, {}], got {}", MAX_BINS, self.max_bin));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_child_weight: self.min_child_weight,
            reg_lambda: self.reg_lambda,
            reg_alpha: self.reg_alpha,
            gamma: self.gamma,
            learning_rate: self.learning_rate,
        }
    }
}

/// Anything the search can fit and score
pub trait Regressor: Send + Sync {
    fn fit(&self, params: &BoosterParams, x: &FeatureMatrix, y: &[f64]) -> Result<GbdtModel>;
}

/// GBDT trainer
#[derive(Debug, Clone, Copy, Default)]
pub struct GbdtTrainer;

impl GbdtTrainer {
    pub fn new() -> Self {
        Self
    }

    /// Train a model on the given matrix and targets
    pub fn train(&self, params: &BoosterParams, x: &FeatureMatrix, y: &[f64]) -> Result<GbdtModel> {
        params.validate()?;
        let n_samples = x.n_rows();
        let n_features = x.n_features();

        if n_samples == 0 {
            return Err(TrainerError::EmptyDataset("no training rows".into()));
        }
        if y.len() != n_samples {
            return Err(TrainerError::InvalidTarget(format!(
                "{} targets for {} rows",
                y.len(),
                n_samples
            )));
        }
        if let Some(v) = y.iter().find(|v| !v.is_finite()) {
            return Err(TrainerError::InvalidTarget(format!("non-finite target {}", v)));
        }

        let mapper = BinMapper::fit(x, params.max_bin);
        let bins = mapper.transform(x);

        let base_score = y.iter().sum::<f64>() / n_samples as f64;
        let mut predictions = vec![base_score; n_samples];
        let hessians = vec![1.0; n_samples];

        let mut rng = StdRng::seed_from_u64(params.seed);
        let col_count = if n_features == 0 {
            0
        } else {
            ((params.colsample_bytree * n_features as f64).floor() as usize).clamp(1, n_features)
        };

        let mut trees = Vec::with_capacity(params.n_estimators);
        for tree_idx in 0..params.n_estimators {
            // Squared error: gradient = prediction - target, hessian = 1
            let gradients: Vec<f64> = predictions.iter().zip(y).map(|(p, t)| p - t).collect();

            let rows = sample_rows(&mut rng, n_samples, params.subsample);
            let mut features = index::sample(&mut rng, n_features, col_count).into_vec();
            features.sort_unstable();

            let builder = CartBuilder::new(
                &bins,
                &mapper,
                &gradients,
                &hessians,
                &features,
                params.tree_config(),
            );
            let tree = builder.build(&rows);

            for (i, pred) in predictions.iter_mut().enumerate() {
                *pred += tree.predict_row(x.row(i));
            }

            if tree_idx % 100 == 0 || tree_idx + 1 == params.n_estimators {
                debug!(
                    "Tree {}/{}: {} nodes, {} rows, {} features",
                    tree_idx + 1,
                    params.n_estimators,
                    tree.nodes.len(),
                    rows.len(),
                    features.len()
                );
            }
            trees.push(tree);
        }

        Ok(GbdtModel {
            base_score,
            trees,
            feature_names: x.names().to_vec(),
            params: params.clone(),
        })
    }
}

impl Regressor for GbdtTrainer {
    fn fit(&self, params: &BoosterParams, x: &FeatureMatrix, y: &[f64]) -> Result<GbdtModel> {
        self.train(params, x, y)
    }
}

/// Bernoulli row sample; never empty
fn sample_rows(rng: &mut StdRng, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let mut rows: Vec<usize> = (0..n).filter(|_| rng.gen::<f64>() < ratio).collect();
    if rows.is_empty() {
        rows.push(rng.gen_range(0..n));
    }
    rows
}

/// Trained boosted ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtModel {
    pub base_score: f64,
    pub trees: Vec<Tree>,
    pub feature_names: Vec<String>,
    pub params: BoosterParams,
}

impl GbdtModel {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|t| t.predict_row(features))
                .sum::<f64>()
    }

    /// Predict every row; the matrix must carry the training feature names
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if x.names() != self.feature_names.as_slice() {
            return Err(TrainerError::InvalidParameters(format!(
                "feature layout differs from training ({} vs {} columns)",
                x.n_features(),
                self.n_features()
            )));
        }
        Ok((0..x.n_rows()).map(|i| self.predict_row(x.row(i))).collect())
    }

    /// Split count per feature, highest first; ties keep column order
    pub fn feature_importance(&self) -> Vec<(String, u64)> {
        let mut counts = vec![0u64; self.n_features()];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        let mut ranked: Vec<(String, u64)> =
            self.feature_names.iter().cloned().zip(counts).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Canonical JSON: object keys sorted, no whitespace
    pub fn to_canonical_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)
            .map_err(|e| TrainerError::Serialization(e.to_string()))?;
        serde_json::to_string(&value).map_err(|e| TrainerError::Serialization(e.to_string()))
    }

    /// BLAKE3 hash of the canonical JSON, hex encoded
    pub fn fingerprint(&self) -> Result<String> {
        let json = self.to_canonical_json()?;
        Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (FeatureMatrix, Vec<f64>) {
        let a: Vec<f64> = (0..60).map(|i| i as f64 * 0.1).collect();
        let b: Vec<f64> = (0..60).map(|i| ((i * 7) % 13) as f64).collect();
        let y = a.iter().zip(&b).map(|(a, b)| 2.0 * a + 0.5 * b + 1.0).collect();
        let x = FeatureMatrix::from_columns(vec![("a".into(), a), ("b".into(), b)]).unwrap();
        (x, y)
    }

    fn params() -> BoosterParams {
        BoosterParams {
            n_estimators: 50,
            max_depth: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_fit_reduces_error() -> anyhow::Result<()> {
        let (x, y) = linear_data();
        let model = GbdtTrainer::new().train(&params(), &x, &y)?;
        let preds = model.predict(&x)?;

        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let baseline: f64 = y.iter().map(|t| (t - mean).powi(2)).sum();
        let residual: f64 = y.iter().zip(&preds).map(|(t, p)| (t - p).powi(2)).sum();
        assert!(residual < 0.05 * baseline, "residual {} vs baseline {}", residual, baseline);
        assert_eq!(model.trees.len(), 50);
        Ok(())
    }

    #[test]
    fn test_determinism() -> anyhow::Result<()> {
        let (x, y) = linear_data();
        let p = BoosterParams {
            subsample: 0.7,
            colsample_bytree: 0.5,
            ..params()
        };
        let model1 = GbdtTrainer::new().train(&p, &x, &y)?;
        let model2 = GbdtTrainer::new().train(&p, &x, &y)?;
        assert_eq!(model1, model2);
        assert_eq!(model1.fingerprint()?, model2.fingerprint()?);

        let other = GbdtTrainer::new().train(&BoosterParams { seed: 7, ..p }, &x, &y)?;
        assert_ne!(model1.fingerprint()?, other.fingerprint()?);
        Ok(())
    }

    #[test]
    fn test_base_score_is_mean() -> anyhow::Result<()> {
        let (x, y) = linear_data();
        let model = GbdtTrainer::new().train(&params(), &x, &y)?;
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        assert!((model.base_score - mean).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_out_of_domain() {
        for p in [
            BoosterParams { subsample: 0.0, ..params() },
            BoosterParams { colsample_bytree: 0.0, ..params() },
            BoosterParams { colsample_bytree: 1.5, ..params() },
            BoosterParams { learning_rate: 0.0, ..params() },
            BoosterParams { max_depth: 0, ..params() },
            BoosterParams { n_estimators: 0, ..params() },
            BoosterParams { reg_alpha: -1.0, ..params() },
            BoosterParams { max_bin: 1, ..params() },
        ] {
            assert!(matches!(p.validate(), Err(TrainerError::InvalidParameters(_))), "{:?}", p);
        }
        assert!(params().validate().is_ok());
    }

    #[test]
    fn test_missing_values_are_routed() -> anyhow::Result<()> {
        let x = FeatureMatrix::from_columns(vec![(
            "a".into(),
            vec![1.0, 2.0, f64::NAN, 4.0, f64::NAN, 6.0],
        )])?;
        let y = vec![1.0, 1.0, 10.0, 1.0, 10.0, 1.0];
        let p = BoosterParams {
            n_estimators: 20,
            learning_rate: 0.5,
            max_depth: 1,
            reg_lambda: 0.0,
            min_child_weight: 0.0,
            ..Default::default()
        };
        let model = GbdtTrainer::new().train(&p, &x, &y)?;
        assert!(model.predict_row(&[f64::NAN]) > 9.0);
        assert!(model.predict_row(&[3.0]) < 2.0);
        Ok(())
    }

    #[test]
    fn test_feature_importance_and_layout_check() -> anyhow::Result<()> {
        let (x, y) = linear_data();
        let model = GbdtTrainer::new().train(&params(), &x, &y)?;
        let importance = model.feature_importance();
        assert_eq!(importance.len(), 2);
        assert!(importance[0].1 >= importance[1].1);
        assert!(importance.iter().map(|(_, c)| c).sum::<u64>() > 0);

        let renamed = FeatureMatrix::from_columns(vec![
            ("b".into(), vec![0.0]),
            ("a".into(), vec![0.0]),
        ])?;
        assert!(model.predict(&renamed).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_and_mismatched_inputs() {
        let empty = FeatureMatrix::from_columns(vec![("a".into(), vec![])]).unwrap();
        assert!(matches!(
            GbdtTrainer::new().train(&params(), &empty, &[]),
            Err(TrainerError::EmptyDataset(_))
        ));
        let (x, _) = linear_data();
        assert!(matches!(
            GbdtTrainer::new().train(&params(), &x, &[1.0]),
            Err(TrainerError::InvalidTarget(_))
        ));
    }
}
