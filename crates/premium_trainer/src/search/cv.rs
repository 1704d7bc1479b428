//! K-fold cross-validation splits

use crate::errors::{Result, TrainerError};

/// Train and test row indices of one fold
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Contiguous, unshuffled folds. The first `n % k` folds take one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(TrainerError::InvalidParameters(format!(
                "k-fold needs at least 2 splits, got {}",
                n_splits
            )));
        }
        Ok(Self { n_splits })
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        if n_samples < self.n_splits {
            return Err(TrainerError::EmptyDataset(format!(
                "{} rows cannot fill {} folds",
                n_samples, self.n_splits
            )));
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test: Vec<usize> = (current..current + fold_size).collect();
            let train: Vec<usize> = (0..current).chain(current + fold_size..n_samples).collect();
            folds.push(Fold { train, test });
            current += fold_size;
        }
        Ok(folds)
    }
}
