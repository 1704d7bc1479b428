//! Quantile binning of feature columns
//!
//! Each feature is cut into at most `max_bin` bins at training time. Bin `b`
//! holds values in `(cuts[b - 1], cuts[b]]`, so a split "bin <= b" is the same
//! as "value <= cuts[b]" on raw data. Missing values get their own marker and
//! never enter a numeric bin.

use premium_core::FeatureMatrix;
use rayon::prelude::*;

/// Bin marker for a missing value
pub const MISSING_BIN: u16 = u16::MAX;

/// Largest supported `max_bin`
pub const MAX_BINS: usize = MISSING_BIN as usize;

/// Per-feature upper bin edges
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    cuts: Vec<Vec<f64>>,
}

impl BinMapper {
    /// Learn cuts from the observed values of every column
    pub fn fit(matrix: &FeatureMatrix, max_bin: usize) -> Self {
        let max_bin = max_bin.clamp(2, MAX_BINS);
        let cuts = (0..matrix.n_features())
            .into_par_iter()
            .map(|j| {
                let mut values: Vec<f64> = (0..matrix.n_rows())
                    .map(|i| matrix.get(i, j))
                    .filter(|v| !v.is_nan())
                    .collect();
                values.sort_by(|a, b| a.total_cmp(b));
                quantile_cuts(&values, max_bin)
            })
            .collect();
        Self { cuts }
    }

    pub fn n_features(&self) -> usize {
        self.cuts.len()
    }

    /// Number of numeric bins of a feature
    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len()
    }

    /// Raw threshold equivalent to "bin <= `bin`"
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.cuts[feature][bin]
    }

    pub fn bin_of(&self, feature: usize, value: f64) -> u16 {
        if value.is_nan() {
            return MISSING_BIN;
        }
        let cuts = &self.cuts[feature];
        let idx = cuts.partition_point(|c| *c < value);
        idx.min(cuts.len().saturating_sub(1)) as u16
    }

    /// Bin every cell, column-major
    pub fn transform(&self, matrix: &FeatureMatrix) -> BinnedMatrix {
        let columns = (0..matrix.n_features())
            .into_par_iter()
            .map(|j| {
                (0..matrix.n_rows())
                    .map(|i| self.bin_of(j, matrix.get(i, j)))
                    .collect()
            })
            .collect();
        BinnedMatrix {
            columns,
            rows: matrix.n_rows(),
        }
    }
}

/// Distinct values when they fit, otherwise evenly spaced order statistics.
/// The last cut is always the column maximum.
fn quantile_cuts(sorted: &[f64], max_bin: usize) -> Vec<f64> {
    let mut distinct = sorted.to_vec();
    distinct.dedup();
    if distinct.len() <= max_bin {
        return distinct;
    }
    let n = sorted.len();
    let mut cuts: Vec<f64> = (1..max_bin).map(|k| sorted[k * n / max_bin - 1]).collect();
    if let Some(&last) = sorted.last() {
        cuts.push(last);
    }
    cuts.dedup();
    cuts
}

/// Column-major bin indices of a training matrix
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    columns: Vec<Vec<u16>>,
    rows: usize,
}

impl BinnedMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, feature: usize) -> &[u16] {
        &self.columns[feature]
    }

    pub fn get(&self, row: usize, feature: usize) -> u16 {
        self.columns[feature][row]
    }
}
