//! Standard scaling of numeric columns

use serde::{Deserialize, Serialize};

use crate::errors::{PremiumError, Result};
use crate::table::Table;

/// Mean and scale of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub mean: f64,
    pub scale: f64,
}

impl ScaleParams {
    /// Population statistics over the observed values
    pub fn from_values(values: &[Option<f64>]) -> Option<Self> {
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        if observed.is_empty() {
            return None;
        }
        let n = observed.len() as f64;
        let mean = observed.iter().sum::<f64>() / n;
        let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        Some(Self {
            mean,
            scale: if std > 0.0 { std } else { 1.0 },
        })
    }

    pub fn apply(&self, value: Option<f64>) -> f64 {
        match value {
            Some(v) => (v - self.mean) / self.scale,
            None => f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl StandardScaler {
    /// Fit one set of statistics per listed column
    pub fn fit(&self, table: &Table, columns: &[String]) -> Result<FittedScaler> {
        let mut params = Vec::with_capacity(columns.len());
        for column in columns {
            let p = ScaleParams::from_values(table.numeric(column)?)
                .ok_or_else(|| PremiumError::EmptyColumn(column.clone()))?;
            params.push((column.clone(), p));
        }
        Ok(FittedScaler { params })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    params: Vec<(String, ScaleParams)>,
}

impl FittedScaler {
    pub fn params(&self, column: &str) -> Option<ScaleParams> {
        self.params
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, p)| *p)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(c, _)| c.as_str())
    }

    pub fn transform_column(&self, table: &Table, column: &str) -> Result<Vec<f64>> {
        let params = self.params(column).ok_or_else(|| {
            PremiumError::SchemaMismatch(format!("numeric column '{}' was not fitted", column))
        })?;
        Ok(table
            .numeric(column)?
            .iter()
            .map(|v| params.apply(*v))
            .collect())
    }
}
