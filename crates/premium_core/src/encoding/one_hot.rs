//! One-hot encoding of nominal fields with a dropped reference level

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::schema::Field;
use crate::table::Table;

/// Name suffix of the indicator for the missing level
pub const MISSING_LEVEL: &str = "nan";

/// Nominal columns to expand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
}

impl OneHotEncoder {
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(
            [
                Field::Gender,
                Field::MaritalStatus,
                Field::Occupation,
                Field::Location,
                Field::SmokingStatus,
                Field::PropertyType,
                Field::PolicyType,
                Field::ExerciseFrequency,
            ]
            .iter()
            .map(|f| f.name())
            .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Learn the sorted level set of every column
    pub fn fit(&self, table: &Table) -> Result<FittedOneHot> {
        let mut fields = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = table.categorical(column)?;
            let mut levels: Vec<String> = values.iter().flatten().cloned().collect();
            levels.sort();
            levels.dedup();
            let has_missing = values.iter().any(|v| v.is_none());
            debug!(
                "One-hot {}: {} levels, missing level = {}",
                column,
                levels.len(),
                has_missing
            );
            fields.push(FieldLevels {
                column: column.clone(),
                levels,
                has_missing,
            });
        }
        Ok(FittedOneHot { fields })
    }
}

/// Levels of one nominal column. Missing sorts after every named level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLevels {
    pub column: String,
    pub levels: Vec<String>,
    pub has_missing: bool,
}

impl FieldLevels {
    /// Levels that get an indicator column: everything after the first
    fn kept(&self) -> Vec<Option<&str>> {
        self.levels
            .iter()
            .map(|l| Some(l.as_str()))
            .chain(self.has_missing.then_some(None))
            .skip(1)
            .collect()
    }

    fn feature_names(&self) -> Vec<String> {
        self.kept()
            .into_iter()
            .map(|level| format!("{}_{}", self.column, level.unwrap_or(MISSING_LEVEL)))
            .collect()
    }
}

/// Stored level sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOneHot {
    fields: Vec<FieldLevels>,
}

impl FittedOneHot {
    pub fn fields(&self) -> &[FieldLevels] {
        &self.fields
    }

    /// Output column names in emission order
    pub fn feature_names(&self) -> Vec<String> {
        self.fields.iter().flat_map(|f| f.feature_names()).collect()
    }

    /// Indicator columns. A level not seen during fit, or the dropped
    /// reference level, produces all zeros.
    pub fn transform(&self, table: &Table) -> Result<Vec<(String, Vec<f64>)>> {
        let mut out = Vec::new();
        for field in &self.fields {
            let values = table.categorical(&field.column)?;
            for (level, name) in field.kept().into_iter().zip(field.feature_names()) {
                let indicator = values
                    .iter()
                    .map(|v| if v.as_deref() == level { 1.0 } else { 0.0 })
                    .collect();
                out.push((name, indicator));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table(values: Vec<Option<&str>>) -> Table {
        Table::from_columns(vec![Column::categorical("smoking_status", values)]).unwrap()
    }

    #[test]
    fn test_drops_first_sorted_level() {
        let train = table(vec![Some("Yes"), Some("No"), Some("Yes")]);
        let fitted = OneHotEncoder::new(vec!["smoking_status"]).fit(&train).unwrap();
        assert_eq!(fitted.feature_names(), vec!["smoking_status_Yes"]);

        let out = fitted.transform(&train).unwrap();
        assert_eq!(out[0].1, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_level_sorts_last() {
        let train = table(vec![Some("Yes"), None, Some("No")]);
        let fitted = OneHotEncoder::new(vec!["smoking_status"]).fit(&train).unwrap();
        assert_eq!(
            fitted.feature_names(),
            vec!["smoking_status_Yes", "smoking_status_nan"]
        );
        let out = fitted.transform(&train).unwrap();
        assert_eq!(out[1].1, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_level_maps_to_zeros() {
        let train = table(vec![Some("Yes"), Some("No")]);
        let fitted = OneHotEncoder::new(vec!["smoking_status"]).fit(&train).unwrap();
        let fresh = table(vec![Some("Sometimes"), None]);
        let out = fitted.transform(&fresh).unwrap();
        assert_eq!(out[0].1, vec![0.0, 0.0]);
    }

    #[test]
    fn test_single_level_emits_nothing() {
        let train = table(vec![Some("No"), Some("No")]);
        let fitted = OneHotEncoder::new(vec!["smoking_status"]).fit(&train).unwrap();
        assert!(fitted.transform(&train).unwrap().is_empty());
    }
}
