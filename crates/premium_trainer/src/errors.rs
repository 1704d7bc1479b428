use premium_core::PremiumError;
use thiserror::Error;

/// Errors returned by the regressor and the search.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("preprocessing error: {0}")]
    Preprocessing(#[from] PremiumError),

    #[error("invalid booster parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("scoring error: {0}")]
    Scoring(String),

    #[error("no viable candidate: all {0} trials failed")]
    NoViableCandidate(usize),

    #[error("empty dataset: {0}")]
    EmptyDataset(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
