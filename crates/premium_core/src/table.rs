//! Column-oriented table threaded through the preprocessing stages
//!
//! Columns are addressed by name. Missing cells are `None`. Every stage takes
//! a `&Table` and returns a new `Table`.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::errors::{PremiumError, Result};
use crate::schema::ColumnKind;

/// Typed column storage
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Date(Vec<Option<NaiveDateTime>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
            ColumnData::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
            ColumnData::Date(_) => ColumnKind::Date,
        }
    }

    pub fn missing_count(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Categorical(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Date(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }
}

/// Named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(
                values.into_iter().map(|v| v.map(Into::into)).collect(),
            ),
        }
    }

    pub fn date(name: impl Into<String>, values: Vec<Option<NaiveDateTime>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Date(values),
        }
    }
}

/// Missing-value share of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingSummary {
    pub column: String,
    pub missing: usize,
    pub percent: f64,
}

/// Ordered rows sharing one schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Build a table, checking that all columns have the same length and
    /// distinct names
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Table::default();
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| PremiumError::SchemaMismatch(format!("column '{}' not found", name)))
    }

    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(v) => Ok(v),
            other => Err(kind_mismatch(name, ColumnKind::Numeric, other.kind())),
        }
    }

    pub fn categorical(&self, name: &str) -> Result<&[Option<String>]> {
        match &self.column(name)?.data {
            ColumnData::Categorical(v) => Ok(v),
            other => Err(kind_mismatch(name, ColumnKind::Categorical, other.kind())),
        }
    }

    pub fn date(&self, name: &str) -> Result<&[Option<NaiveDateTime>]> {
        match &self.column(name)?.data {
            ColumnData::Date(v) => Ok(v),
            other => Err(kind_mismatch(name, ColumnKind::Date, other.kind())),
        }
    }

    pub(crate) fn numeric_mut(&mut self, name: &str) -> Result<&mut Vec<Option<f64>>> {
        match &mut self.column_mut(name)?.data {
            ColumnData::Numeric(v) => Ok(v),
            other => Err(kind_mismatch(name, ColumnKind::Numeric, other.kind())),
        }
    }

    pub(crate) fn categorical_mut(&mut self, name: &str) -> Result<&mut Vec<Option<String>>> {
        match &mut self.column_mut(name)?.data {
            ColumnData::Categorical(v) => Ok(v),
            other => Err(kind_mismatch(name, ColumnKind::Categorical, other.kind())),
        }
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| PremiumError::SchemaMismatch(format!("column '{}' not found", name)))
    }

    /// Append a column
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.contains(&column.name) {
            return Err(PremiumError::SchemaMismatch(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        if self.columns.is_empty() {
            self.rows = column.data.len();
        } else if column.data.len() != self.rows {
            return Err(PremiumError::SchemaMismatch(format!(
                "column '{}' has {} rows, table has {}",
                column.name,
                column.data.len(),
                self.rows
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column and return it
    pub fn drop_column(&mut self, name: &str) -> Result<Column> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| PremiumError::SchemaMismatch(format!("column '{}' not found", name)))?;
        Ok(self.columns.remove(idx))
    }

    /// Names of the columns with the given kind, in table order
    pub fn names_of_kind(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.data.kind() == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Missing-value count and percentage per column
    pub fn missing_report(&self) -> Vec<MissingSummary> {
        self.columns
            .iter()
            .map(|c| {
                let missing = c.data.missing_count();
                let percent = if self.rows == 0 {
                    0.0
                } else {
                    missing as f64 / self.rows as f64 * 100.0
                };
                MissingSummary {
                    column: c.name.clone(),
                    missing,
                    percent,
                }
            })
            .collect()
    }
}

fn kind_mismatch(name: &str, expected: ColumnKind, actual: ColumnKind) -> PremiumError {
    PremiumError::SchemaMismatch(format!(
        "column '{}' is {:?}, expected {:?}",
        name, actual, expected
    ))
}
