//! Error types for the preprocessing crate

use thiserror::Error;

/// Errors raised while loading, imputing or encoding policy data
#[derive(Error, Debug)]
pub enum PremiumError {
    /// A declared column is absent or has the wrong kind
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Missing values remain in a column that no imputation rule covers
    #[error("Column '{column}' has {count} missing values and no imputation rule")]
    UncoveredMissing { column: String, count: usize },

    /// Ordinal level outside the declared category order
    #[error("Unknown category '{value}' in ordinal column '{column}'")]
    UnknownCategory { column: String, value: String },

    /// Statistic requested over a column with no observed values
    #[error("Column '{0}' has no observed values")]
    EmptyColumn(String),

    /// Cell could not be parsed into the column's declared kind
    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for preprocessing operations
pub type Result<T> = std::result::Result<T, PremiumError>;
