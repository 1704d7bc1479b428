//! Imputation, tenure derivation and encoding chained into one fitted object

use chrono::NaiveDateTime;
use tracing::info;

use crate::encoding::{Encoder, FittedEncoder};
use crate::errors::Result;
use crate::imputation::{FittedImputer, Imputer};
use crate::matrix::FeatureMatrix;
use crate::table::Table;
use crate::tenure::TenureDeriver;

/// Unfitted preprocessing chain
#[derive(Debug, Clone)]
pub struct Preprocessor {
    imputer: Imputer,
    deriver: TenureDeriver,
    encoder: Encoder,
}

impl Preprocessor {
    /// Standard rules and encoders; `None` binds the processing time to the
    /// local clock now
    pub fn new(processing_date: Option<NaiveDateTime>) -> Self {
        let deriver = match processing_date {
            Some(at) => TenureDeriver::new(at),
            None => TenureDeriver::now(),
        };
        Self::with_stages(Imputer::standard(), deriver, Encoder::standard())
    }

    pub fn with_stages(imputer: Imputer, deriver: TenureDeriver, encoder: Encoder) -> Self {
        Self {
            imputer,
            deriver,
            encoder,
        }
    }

    pub fn fit_transform(&self, table: &Table) -> Result<(FittedPreprocessor, FeatureMatrix)> {
        info!(
            "Preprocessing {} rows (processing time {})",
            table.len(),
            self.deriver.processing_time()
        );
        let (imputer, imputed) = self.imputer.fit_transform(table)?;
        let derived = self.deriver.derive(&imputed)?;
        let (encoder, matrix) = self.encoder.fit_transform(&derived)?;
        info!(
            "Feature matrix: {} rows x {} features",
            matrix.n_rows(),
            matrix.n_features()
        );
        Ok((
            FittedPreprocessor {
                imputer,
                deriver: self.deriver,
                encoder,
            },
            matrix,
        ))
    }
}

/// Fitted medians, encoder state and the processing time they were fitted
/// against
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPreprocessor {
    imputer: FittedImputer,
    deriver: TenureDeriver,
    encoder: FittedEncoder,
}

impl FittedPreprocessor {
    pub fn imputer(&self) -> &FittedImputer {
        &self.imputer
    }

    pub fn encoder(&self) -> &FittedEncoder {
        &self.encoder
    }

    pub fn processing_time(&self) -> NaiveDateTime {
        self.deriver.processing_time()
    }

    /// Apply the fitted chain to new rows
    pub fn transform(&self, table: &Table) -> Result<FeatureMatrix> {
        let imputed = self.imputer.transform(table)?;
        let derived = self.deriver.derive(&imputed)?;
        self.encoder.transform(&derived)
    }
}
