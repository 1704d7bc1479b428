//! Preprocessing for insurance premium regression
//!
//! Turns raw policy applications into a numeric feature matrix:
//! missing-value imputation, tenure derivation from the policy start date and
//! categorical/numeric encoding. Every stage is fitted once on training data
//! and reapplied unchanged to new rows.
//!
//! Modules:
//! - `schema`: Fixed field list, CSV headers and column kinds
//! - `table`: Column-oriented table passed between stages
//! - `dataset`: CSV ingestion
//! - `imputation`: Rule-based and median imputation
//! - `tenure`: Customer tenure bucket derivation
//! - `encoding`: Ordinal, one-hot and standard scaling
//! - `matrix`: Dense feature matrix handed to the regressor
//! - `pipeline`: Fitted preprocessing chain
//! - `config`: TOML configuration with environment overrides

pub mod config;
pub mod dataset;
pub mod encoding;
pub mod errors;
pub mod imputation;
pub mod matrix;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod tenure;

pub use config::PipelineConfig;
pub use dataset::Dataset;
pub use encoding::{Encoder, FittedEncoder};
pub use errors::{PremiumError, Result};
pub use imputation::{AgeBand, FillStrategy, FillValue, FittedImputer, ImputationRule, Imputer};
pub use matrix::FeatureMatrix;
pub use pipeline::{FittedPreprocessor, Preprocessor};
pub use schema::{ColumnKind, Field};
pub use table::{Column, ColumnData, Table};
pub use tenure::{TenureBucket, TenureDeriver};

/// Crate version string for run reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
