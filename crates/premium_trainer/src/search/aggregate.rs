//! Reduction of per-fold scores to one candidate score

pub trait Aggregator: Send + Sync {
    fn aggregate(&self, fold_scores: &[f64]) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAggregator;

impl Aggregator for MeanAggregator {
    fn aggregate(&self, fold_scores: &[f64]) -> f64 {
        if fold_scores.is_empty() {
            return f64::NAN;
        }
        fold_scores.iter().sum::<f64>() / fold_scores.len() as f64
    }
}

/// Population standard deviation, reported next to the mean
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(MeanAggregator.aggregate(&[-1.0, -3.0]), -2.0);
        assert!(MeanAggregator.aggregate(&[]).is_nan());
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[1.0, 3.0]), 1.0);
        assert_eq!(std_dev(&[2.0]), 0.0);
    }
}
