//! CSV dataset loading
//!
//! Reads the policy CSV files into a typed [`Table`]. Empty cells (and the
//! usual `NaN`/`NA` spellings) are missing values. The row identifier and the
//! premium target are split off from the feature table.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{PremiumError, Result};
use crate::schema::{ColumnKind, Field, ID_HEADER, TARGET_HEADER};
use crate::table::{Column, Table};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Policy applications with optional target
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Row identifiers (row index when the file carries no id column)
    pub ids: Vec<String>,
    /// Feature columns in schema order
    pub features: Table,
    /// Premium amount, present only for labeled files
    pub target: Option<Vec<f64>>,
}

impl Dataset {
    /// Load a dataset from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading dataset from: {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load a dataset from any CSV reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

        let mut field_idx = Vec::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            let idx = index.get(field.header()).copied().ok_or_else(|| {
                PremiumError::SchemaMismatch(format!("missing column '{}'", field.header()))
            })?;
            field_idx.push((field, idx));
        }
        let id_idx = index.get(ID_HEADER).copied();
        let target_idx = index.get(TARGET_HEADER).copied();

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); field_idx.len()];
        let mut ids = Vec::new();
        let mut target = target_idx.map(|_| Vec::new());

        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            for (slot, (_, idx)) in raw.iter_mut().zip(&field_idx) {
                slot.push(record.get(*idx).unwrap_or("").to_string());
            }
            ids.push(match id_idx {
                Some(i) => record.get(i).unwrap_or("").to_string(),
                None => row.to_string(),
            });
            if let (Some(values), Some(i)) = (target.as_mut(), target_idx) {
                let cell = record.get(i).unwrap_or("");
                let value = parse_number(cell).ok_or_else(|| PremiumError::InvalidValue {
                    column: TARGET_HEADER.to_string(),
                    row,
                    value: cell.to_string(),
                })?;
                values.push(value);
            }
        }

        let mut columns = Vec::with_capacity(field_idx.len());
        for ((field, _), cells) in field_idx.iter().zip(raw) {
            columns.push(parse_column(*field, &cells)?);
        }
        let features = Table::from_columns(columns)?;

        debug!(
            "Parsed {} rows, {} feature columns, labeled = {}",
            features.len(),
            Field::ALL.len(),
            target.is_some()
        );

        Ok(Self {
            ids,
            features,
            target,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Target values, or a schema error for unlabeled data
    pub fn require_target(&self) -> Result<&[f64]> {
        self.target.as_deref().ok_or_else(|| {
            PremiumError::SchemaMismatch(format!("missing target column '{}'", TARGET_HEADER))
        })
    }

    /// Count of target values that are zero or negative
    pub fn non_positive_targets(&self) -> usize {
        self.target
            .as_ref()
            .map(|t| t.iter().filter(|&&v| v <= 0.0).count())
            .unwrap_or(0)
    }
}

fn is_missing(cell: &str) -> bool {
    matches!(cell, "" | "NaN" | "nan" | "NA" | "N/A" | "null")
}

fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.parse::<f64>().ok()
}

/// Parse a policy start timestamp; a bare date maps to midnight
pub fn parse_datetime(cell: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(cell, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_column(field: Field, cells: &[String]) -> Result<Column> {
    let invalid = |row: usize, value: &str| PremiumError::InvalidValue {
        column: field.name().to_string(),
        row,
        value: value.to_string(),
    };

    match field.kind() {
        ColumnKind::Numeric => {
            let mut values = Vec::with_capacity(cells.len());
            for (row, cell) in cells.iter().enumerate() {
                if is_missing(cell) {
                    values.push(None);
                } else {
                    values.push(Some(cell.parse::<f64>().map_err(|_| invalid(row, cell))?));
                }
            }
            Ok(Column::numeric(field.name(), values))
        }
        ColumnKind::Categorical => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| (!is_missing(cell)).then(|| cell.clone()))
                .collect();
            Ok(Column::categorical(field.name(), values))
        }
        ColumnKind::Date => {
            let mut values = Vec::with_capacity(cells.len());
            for (row, cell) in cells.iter().enumerate() {
                if is_missing(cell) {
                    values.push(None);
                } else {
                    values.push(Some(parse_datetime(cell).ok_or_else(|| invalid(row, cell))?));
                }
            }
            Ok(Column::date(field.name(), values))
        }
    }
}
