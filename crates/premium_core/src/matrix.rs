//! Dense feature matrix handed to the regressor
//!
//! Row-major `f64` storage with named columns. `NaN` marks a missing value;
//! the regressor routes it through each split's default direction.

use crate::errors::{PremiumError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Vec<f64>,
    rows: usize,
}

impl FeatureMatrix {
    /// Build from row-major values
    pub fn new(names: Vec<String>, values: Vec<f64>, rows: usize) -> Result<Self> {
        if names.len() * rows != values.len() {
            return Err(PremiumError::SchemaMismatch(format!(
                "{} values do not fill {} rows x {} columns",
                values.len(),
                rows,
                names.len()
            )));
        }
        Ok(Self {
            names,
            values,
            rows,
        })
    }

    /// Build from named columns of equal length
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, _)) = columns.iter().find(|(_, v)| v.len() != rows) {
            return Err(PremiumError::SchemaMismatch(format!(
                "feature column '{}' length differs from {}",
                name, rows
            )));
        }
        let cols = columns.len();
        let mut values = vec![0.0; rows * cols];
        for (j, (_, column)) in columns.iter().enumerate() {
            for (i, v) in column.iter().enumerate() {
                values[i * cols + j] = *v;
            }
        }
        let names = columns.into_iter().map(|(n, _)| n).collect();
        Ok(Self {
            names,
            values,
            rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let cols = self.names.len();
        &self.values[i * cols..(i + 1) * cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.names.len() + col]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Copy of one column by name
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.column_index(name)?;
        Some((0..self.rows).map(|i| self.get(i, j)).collect())
    }

    /// New matrix holding the given rows in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let cols = self.names.len();
        let mut values = Vec::with_capacity(indices.len() * cols);
        for &i in indices {
            values.extend_from_slice(self.row(i));
        }
        Self {
            names: self.names.clone(),
            values,
            rows: indices.len(),
        }
    }
}
