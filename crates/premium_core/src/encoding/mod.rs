//! Conversion of the imputed, derived table into a numeric feature matrix
//!
//! Numeric columns are standardised, ordinal columns ranked against explicit
//! orders and nominal columns expanded into indicator columns. Every learned
//! quantity lives in [`FittedEncoder`] and is reused verbatim on new data.

pub mod one_hot;
pub mod ordinal;
pub mod scaler;

pub use one_hot::{FittedOneHot, OneHotEncoder};
pub use ordinal::{CategoryOrder, OrdinalEncoder};
pub use scaler::{FittedScaler, ScaleParams, StandardScaler};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::errors::{PremiumError, Result};
use crate::matrix::FeatureMatrix;
use crate::schema::ColumnKind;
use crate::table::{ColumnData, Table};

/// Unfitted encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    ordinal: OrdinalEncoder,
    one_hot: OneHotEncoder,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::standard()
    }
}

impl Encoder {
    pub fn new(ordinal: OrdinalEncoder, one_hot: OneHotEncoder) -> Self {
        Self { ordinal, one_hot }
    }

    pub fn standard() -> Self {
        Self::new(OrdinalEncoder::standard(), OneHotEncoder::standard())
    }

    /// Learn scaling statistics and nominal level sets
    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn fit(&self, table: &Table) -> Result<FittedEncoder> {
        self.check_coverage(table)?;
        self.ordinal.validate(table)?;

        let numeric = table.names_of_kind(ColumnKind::Numeric);
        let scaler = StandardScaler.fit(table, &numeric)?;
        let one_hot = self.one_hot.fit(table)?;

        let fitted = FittedEncoder {
            ordinal: self.ordinal.clone(),
            one_hot,
            scaler,
            numeric,
        };
        info!(
            "Encoder fitted: {} scaled, {} ordinal, {} indicator columns",
            fitted.numeric.len(),
            fitted.ordinal.orders().len(),
            fitted.one_hot.feature_names().len()
        );
        Ok(fitted)
    }

    pub fn fit_transform(&self, table: &Table) -> Result<(FittedEncoder, FeatureMatrix)> {
        let fitted = self.fit(table)?;
        let matrix = fitted.transform(table)?;
        Ok((fitted, matrix))
    }

    /// Every categorical column must be ordinal or nominal, and no date
    /// columns may remain
    fn check_coverage(&self, table: &Table) -> Result<()> {
        for column in table.columns() {
            let covered = match column.data {
                ColumnData::Numeric(_) => true,
                ColumnData::Categorical(_) => {
                    self.ordinal.order_for(&column.name).is_some()
                        || self.one_hot.contains(&column.name)
                }
                ColumnData::Date(_) => false,
            };
            if !covered {
                return Err(PremiumError::SchemaMismatch(format!(
                    "column '{}' has no encoding",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

/// Encoder state learned from the training table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoder {
    ordinal: OrdinalEncoder,
    one_hot: FittedOneHot,
    scaler: FittedScaler,
    numeric: Vec<String>,
}

impl FittedEncoder {
    pub fn scaler(&self) -> &FittedScaler {
        &self.scaler
    }

    pub fn one_hot(&self) -> &FittedOneHot {
        &self.one_hot
    }

    /// Columns standardised at fit time
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric
    }

    /// Output feature names: table columns in order with nominal columns
    /// removed, then indicator columns
    pub fn feature_names(&self, table: &Table) -> Vec<String> {
        table
            .column_names()
            .into_iter()
            .filter(|c| !self.is_nominal(c))
            .map(String::from)
            .chain(self.one_hot.feature_names())
            .collect()
    }

    fn is_nominal(&self, column: &str) -> bool {
        self.one_hot.fields().iter().any(|f| f.column == column)
    }

    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn transform(&self, table: &Table) -> Result<FeatureMatrix> {
        let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
        for column in table.columns() {
            let name = column.name.as_str();
            if self.is_nominal(name) {
                continue;
            }
            let values = match &column.data {
                ColumnData::Numeric(_) => self.scaler.transform_column(table, name)?,
                ColumnData::Categorical(values) => match self.ordinal.order_for(name) {
                    Some(order) => order.encode(values)?,
                    None => {
                        return Err(PremiumError::SchemaMismatch(format!(
                            "column '{}' has no encoding",
                            name
                        )))
                    }
                },
                ColumnData::Date(_) => {
                    return Err(PremiumError::SchemaMismatch(format!(
                        "date column '{}' must be derived before encoding",
                        name
                    )))
                }
            };
            columns.push((name.to_string(), values));
        }
        for fitted in &self.numeric {
            if !table.contains(fitted) {
                return Err(PremiumError::SchemaMismatch(format!(
                    "fitted column '{}' is absent",
                    fitted
                )));
            }
        }
        columns.extend(self.one_hot.transform(table)?);
        FeatureMatrix::from_columns(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table() -> Table {
        Table::from_columns(vec![
            Column::numeric("age", vec![Some(20.0), Some(40.0), None]),
            Column::categorical(
                "education_level",
                vec![Some("PhD"), Some("High School"), None],
            ),
            Column::categorical("gender", vec![Some("Male"), Some("Female"), Some("Male")]),
        ])
        .unwrap()
    }

    fn encoder() -> Encoder {
        Encoder::new(
            OrdinalEncoder::new(vec![CategoryOrder::new(
                "education_level",
                vec!["High School", "Bachelor's", "Master's", "PhD"],
            )]),
            OneHotEncoder::new(vec!["gender"]),
        )
    }

    #[test]
    fn test_column_layout() {
        let (fitted, matrix) = encoder().fit_transform(&table()).unwrap();
        assert_eq!(
            matrix.names(),
            &["age", "education_level", "gender_Male"]
        );
        assert_eq!(fitted.feature_names(&table()), matrix.names());
        assert_eq!(matrix.row(0), &[-1.0, 3.0, 1.0]);
        assert!(matrix.get(2, 0).is_nan());
        assert!(matrix.get(2, 1).is_nan());
    }

    #[test]
    fn test_transform_is_deterministic() {
        let (fitted, first) = encoder().fit_transform(&table()).unwrap();
        let second = fitted.transform(&table().clone()).unwrap();
        for i in 0..first.n_rows() {
            let a: Vec<u64> = first.row(i).iter().map(|v| v.to_bits()).collect();
            let b: Vec<u64> = second.row(i).iter().map(|v| v.to_bits()).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_unencodable_column_rejected() {
        let mut t = table();
        t.add_column(Column::categorical("location", vec![Some("Urban"); 3]))
            .unwrap();
        assert!(matches!(
            encoder().fit(&t),
            Err(PremiumError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_transform_requires_fitted_columns() {
        let fitted = encoder().fit(&table()).unwrap();
        let mut fresh = table();
        fresh.drop_column("age").unwrap();
        assert!(fitted.transform(&fresh).is_err());
    }
}
