//! Hyperparameter search
//!
//! The search is assembled from small strategies: a [`ConfigSampler`] picks
//! configurations from a [`SearchSpace`], [`KFold`] cuts the rows, a
//! [`Scorer`] rates each fold and an [`Aggregator`] reduces the fold scores.
//! [`SearchDriver`] runs them against any [`crate::trainer::Regressor`].

pub mod aggregate;
pub mod cv;
pub mod driver;
pub mod sampler;
pub mod scoring;
pub mod space;

pub use aggregate::{std_dev, Aggregator, MeanAggregator};
pub use cv::{Fold, KFold};
pub use driver::{FailureKind, FoldScores, SearchDriver, SearchOutcome, TrialOutcome, TrialResult};
pub use sampler::{ConfigSampler, GridSampler, RandomSampler};
pub use scoring::{NegMeanSquaredLogError, Scorer};
pub use space::{arange, Candidate, SearchSpace};
