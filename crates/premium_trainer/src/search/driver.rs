//! Cross-validated hyperparameter search
//!
//! Every sampled candidate is fitted and scored on each fold (folds run in
//! parallel). Candidates that cannot be fitted or scored are kept as failed
//! trials, ranked after all scored ones and never selected while any trial
//! scored. The best scored candidate is refitted on all rows. When no trial
//! scored but some fitted every fold and only failed at scoring (a negative
//! log target, say), the first of those is refitted instead.

use premium_core::FeatureMatrix;
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use super::aggregate::{std_dev, Aggregator, MeanAggregator};
use super::cv::KFold;
use super::sampler::{ConfigSampler, RandomSampler};
use super::scoring::{NegMeanSquaredLogError, Scorer};
use super::space::{Candidate, SearchSpace};
use crate::errors::{Result, TrainerError};
use crate::trainer::{BoosterParams, GbdtModel, Regressor};

/// Per-fold scores of a candidate that completed every fold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldScores {
    pub test: Vec<f64>,
    pub train: Vec<f64>,
    pub mean_test: f64,
    pub std_test: f64,
    pub mean_train: f64,
}

/// Stage at which a trial failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// The booster rejected the configuration
    InvalidParameters,
    /// Fitting or predicting a fold failed
    Fitting,
    /// Every fold fitted but a score could not be computed
    Scoring,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TrialOutcome {
    Scored(FoldScores),
    Failed { kind: FailureKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResult {
    /// Position in sampling order
    pub index: usize,
    pub candidate: Candidate,
    pub outcome: TrialOutcome,
    /// Competition rank by mean test score; failed trials share the last rank
    pub rank: usize,
    pub elapsed_ms: u128,
}

impl TrialResult {
    pub fn scores(&self) -> Option<&FoldScores> {
        match &self.outcome {
            TrialOutcome::Scored(s) => Some(s),
            TrialOutcome::Failed { .. } => None,
        }
    }

    pub fn mean_test(&self) -> Option<f64> {
        self.scores().map(|s| s.mean_test)
    }

    pub fn is_failed(&self) -> bool {
        self.scores().is_none()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            TrialOutcome::Failed { kind, .. } => Some(*kind),
            TrialOutcome::Scored(_) => None,
        }
    }
}

/// Finished search: every trial, the winner and its refitted model
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub trials: Vec<TrialResult>,
    pub best_index: usize,
    pub best_params: BoosterParams,
    pub model: GbdtModel,
    /// No trial scored; the refitted configuration is the first trial that
    /// only failed at scoring
    pub fallback: bool,
}

impl SearchOutcome {
    pub fn best(&self) -> &TrialResult {
        &self.trials[self.best_index]
    }

    pub fn best_score(&self) -> f64 {
        self.best().mean_test().unwrap_or(f64::NAN)
    }

    /// Trials ordered by rank, then sampling order
    pub fn ranked(&self) -> Vec<&TrialResult> {
        let mut ranked: Vec<&TrialResult> = self.trials.iter().collect();
        ranked.sort_by_key(|t| (t.rank, t.index));
        ranked
    }

    pub fn failed_count(&self) -> usize {
        self.trials.iter().filter(|t| t.is_failed()).count()
    }
}

/// Row slices of one fold, cut once and shared by every candidate
struct FoldData {
    x_train: FeatureMatrix,
    y_train: Vec<f64>,
    x_test: FeatureMatrix,
    y_test: Vec<f64>,
}

/// Sampler, scorer and aggregator composed around a regressor
pub struct SearchDriver<R: Regressor> {
    regressor: R,
    space: SearchSpace,
    base: BoosterParams,
    kfold: KFold,
    iterations: usize,
    sampler: Box<dyn ConfigSampler>,
    scorer: Box<dyn Scorer>,
    aggregator: Box<dyn Aggregator>,
}

impl<R: Regressor> SearchDriver<R> {
    /// Random sampling seeded from `base.seed`, negated MSLE, mean over folds
    pub fn new(
        regressor: R,
        space: SearchSpace,
        base: BoosterParams,
        kfold: KFold,
        iterations: usize,
    ) -> Self {
        let sampler = Box::new(RandomSampler::new(base.seed));
        Self {
            regressor,
            space,
            base,
            kfold,
            iterations,
            sampler,
            scorer: Box::new(NegMeanSquaredLogError),
            aggregator: Box::new(MeanAggregator),
        }
    }

    pub fn with_sampler(mut self, sampler: Box<dyn ConfigSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Box<dyn Aggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn run(&self, x: &FeatureMatrix, y: &[f64]) -> Result<SearchOutcome> {
        self.space.validate()?;
        if self.iterations == 0 {
            return Err(TrainerError::InvalidParameters(
                "search needs at least one iteration".into(),
            ));
        }
        if y.len() != x.n_rows() {
            return Err(TrainerError::InvalidTarget(format!(
                "{} targets for {} rows",
                y.len(),
                x.n_rows()
            )));
        }

        let folds: Vec<FoldData> = self
            .kfold
            .split(x.n_rows())?
            .into_iter()
            .map(|fold| FoldData {
                x_train: x.select_rows(&fold.train),
                y_train: fold.train.iter().map(|&i| y[i]).collect(),
                x_test: x.select_rows(&fold.test),
                y_test: fold.test.iter().map(|&i| y[i]).collect(),
            })
            .collect();

        let candidates = self.sampler.sample(&self.space, self.iterations);
        info!(
            "Searching {} candidates ({} sampler, space of {}) with {}-fold CV, scoring {}",
            candidates.len(),
            self.sampler.name(),
            self.space.size(),
            self.kfold.n_splits(),
            self.scorer.name()
        );

        let mut trials = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.into_iter().enumerate() {
            let started = Instant::now();
            let outcome = self.evaluate(&candidate, &folds);
            match &outcome {
                TrialOutcome::Scored(s) => info!(
                    "Trial {}/{}: mean test {:.6} (±{:.6}), mean train {:.6}",
                    index + 1,
                    self.iterations,
                    s.mean_test,
                    s.std_test,
                    s.mean_train
                ),
                TrialOutcome::Failed { reason, .. } => warn!(
                    "Trial {}/{} failed: {} [{}]",
                    index + 1,
                    self.iterations,
                    reason,
                    candidate.summary()
                ),
            }
            trials.push(TrialResult {
                index,
                candidate,
                outcome,
                rank: 0,
                elapsed_ms: started.elapsed().as_millis(),
            });
        }

        assign_ranks(&mut trials);
        let (best_index, fallback) = match select_best(&trials) {
            Some(i) => (i, false),
            None => {
                let i = select_fallback(&trials)
                    .ok_or(TrainerError::NoViableCandidate(trials.len()))?;
                warn!(
                    "No trial could be scored; refitting the first trial that fitted every fold (#{})",
                    i + 1
                );
                (i, true)
            }
        };

        let best_params = trials[best_index].candidate.apply(&self.base);
        info!(
            "Best candidate #{} scored {:.6}: {}",
            best_index + 1,
            trials[best_index].mean_test().unwrap_or(f64::NAN),
            trials[best_index].candidate.summary()
        );

        info!("Refitting best configuration on {} rows", x.n_rows());
        let model = self.regressor.fit(&best_params, x, y)?;

        Ok(SearchOutcome {
            trials,
            best_index,
            best_params,
            model,
            fallback,
        })
    }

    fn evaluate(&self, candidate: &Candidate, folds: &[FoldData]) -> TrialOutcome {
        let params = candidate.apply(&self.base);
        if let Err(e) = params.validate() {
            return TrialOutcome::Failed {
                kind: FailureKind::InvalidParameters,
                reason: e.to_string(),
            };
        }

        let per_fold: std::result::Result<Vec<(f64, f64)>, (FailureKind, TrainerError)> = folds
            .par_iter()
            .map(|fold| {
                let fitting = |e: TrainerError| (FailureKind::Fitting, e);
                let scoring = |e: TrainerError| (FailureKind::Scoring, e);
                let model = self
                    .regressor
                    .fit(&params, &fold.x_train, &fold.y_train)
                    .map_err(fitting)?;
                let test_pred = model.predict(&fold.x_test).map_err(fitting)?;
                let train_pred = model.predict(&fold.x_train).map_err(fitting)?;
                Ok((
                    self.scorer.score(&fold.y_test, &test_pred).map_err(scoring)?,
                    self.scorer.score(&fold.y_train, &train_pred).map_err(scoring)?,
                ))
            })
            .collect();

        let (test, train): (Vec<f64>, Vec<f64>) = match per_fold {
            Ok(scores) => scores.into_iter().unzip(),
            Err((kind, e)) => {
                return TrialOutcome::Failed {
                    kind,
                    reason: e.to_string(),
                }
            }
        };

        let mean_test = self.aggregator.aggregate(&test);
        if !mean_test.is_finite() {
            return TrialOutcome::Failed {
                kind: FailureKind::Scoring,
                reason: format!("aggregate test score is {}", mean_test),
            };
        }
        TrialOutcome::Scored(FoldScores {
            std_test: std_dev(&test),
            mean_train: self.aggregator.aggregate(&train),
            mean_test,
            test,
            train,
        })
    }
}

/// Competition ("min") ranking by mean test score, highest first. Failed
/// trials all take the rank after the last scored one.
fn assign_ranks(trials: &mut [TrialResult]) {
    let scores: Vec<Option<f64>> = trials.iter().map(|t| t.mean_test()).collect();
    let scored = scores.iter().flatten().count();
    for (trial, score) in trials.iter_mut().zip(&scores) {
        trial.rank = match score {
            Some(s) => 1 + scores.iter().flatten().filter(|other| *other > s).count(),
            None => scored + 1,
        };
    }
}

/// Highest mean test score; the earliest sampled wins a tie
fn select_best(trials: &[TrialResult]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for trial in trials {
        if let Some(score) = trial.mean_test() {
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((trial.index, score));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// First trial that fitted every fold and only failed at scoring
fn select_fallback(trials: &[TrialResult]) -> Option<usize> {
    trials
        .iter()
        .find(|t| t.failure_kind() == Some(FailureKind::Scoring))
        .map(|t| t.index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::sampler::GridSampler;
    use crate::trainer::GbdtTrainer;

    fn trial(index: usize, score: Option<f64>) -> TrialResult {
        let candidate = SearchSpace::premium_default().candidate([0; 8]);
        let outcome = match score {
            Some(s) => TrialOutcome::Scored(FoldScores {
                test: vec![s],
                train: vec![s],
                mean_test: s,
                std_test: 0.0,
                mean_train: s,
            }),
            None => TrialOutcome::Failed {
                kind: FailureKind::InvalidParameters,
                reason: "invalid".into(),
            },
        };
        TrialResult {
            index,
            candidate,
            outcome,
            rank: 0,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_competition_ranking() {
        let mut trials = vec![
            trial(0, Some(-0.5)),
            trial(1, Some(-0.2)),
            trial(2, None),
            trial(3, Some(-0.2)),
            trial(4, Some(-0.9)),
        ];
        assign_ranks(&mut trials);
        let ranks: Vec<usize> = trials.iter().map(|t| t.rank).collect();
        assert_eq!(ranks, vec![3, 1, 5, 1, 4]);
        // first sampled wins the tie
        assert_eq!(select_best(&trials), Some(1));
    }

    #[test]
    fn test_all_failed_selects_nothing() {
        let mut trials = vec![trial(0, None), trial(1, None)];
        assign_ranks(&mut trials);
        assert!(trials.iter().all(|t| t.rank == 1));
        assert_eq!(select_best(&trials), None);
    }

    fn data() -> (FeatureMatrix, Vec<f64>) {
        let a: Vec<f64> = (0..40).map(|i| (i % 10) as f64).collect();
        let y = a.iter().map(|v| (100.0 + 20.0 * v).ln_1p()).collect();
        (FeatureMatrix::from_columns(vec![("a".into(), a)]).unwrap(), y)
    }

    fn tiny_space() -> SearchSpace {
        SearchSpace {
            n_estimators: vec![5, 10],
            learning_rate: vec![0.3],
            max_depth: vec![2],
            subsample: vec![0.0, 1.0],
            colsample_bytree: vec![1.0],
            gamma: vec![0.0],
            reg_lambda: vec![1.0],
            reg_alpha: vec![0.0],
        }
    }

    #[test]
    fn test_invalid_candidates_fail_but_search_succeeds() -> anyhow::Result<()> {
        let (x, y) = data();
        let driver = SearchDriver::new(
            GbdtTrainer::new(),
            tiny_space(),
            BoosterParams::default(),
            KFold::new(4)?,
            4,
        )
        .with_sampler(Box::new(GridSampler));
        let outcome = driver.run(&x, &y)?;

        assert_eq!(outcome.trials.len(), 4);
        assert_eq!(outcome.failed_count(), 2);
        assert!(outcome.best().candidate.subsample > 0.0);
        assert_eq!(outcome.best().rank, 1);
        assert!(outcome.ranked().last().unwrap().is_failed());
        assert_eq!(outcome.model.params, outcome.best_params);
        Ok(())
    }

    #[test]
    fn test_no_viable_candidate() -> anyhow::Result<()> {
        let (x, y) = data();
        let space = SearchSpace {
            subsample: vec![0.0],
            ..tiny_space()
        };
        let driver = SearchDriver::new(
            GbdtTrainer::new(),
            space,
            BoosterParams::default(),
            KFold::new(2)?,
            3,
        );
        assert!(matches!(
            driver.run(&x, &y),
            Err(TrainerError::NoViableCandidate(3))
        ));
        Ok(())
    }

    #[test]
    fn test_scoring_failures_fall_back_to_first_fitted_trial() -> anyhow::Result<()> {
        let (x, mut y) = data();
        // a premium of -0.5 gives a negative log target, which MSLE rejects
        y[5] = (-0.5f64).ln_1p();
        let driver = SearchDriver::new(
            GbdtTrainer::new(),
            tiny_space(),
            BoosterParams::default(),
            KFold::new(4)?,
            4,
        )
        .with_sampler(Box::new(GridSampler));
        let outcome = driver.run(&x, &y)?;

        assert!(outcome.fallback);
        assert_eq!(outcome.failed_count(), 4);
        let kinds: Vec<_> = outcome.trials.iter().filter_map(|t| t.failure_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                FailureKind::InvalidParameters,
                FailureKind::Scoring,
                FailureKind::InvalidParameters,
                FailureKind::Scoring,
            ]
        );
        // grid order puts the first valid configuration second
        assert_eq!(outcome.best_index, 1);
        assert!(outcome.best_score().is_nan());
        assert_eq!(outcome.model.params, outcome.best_params);
        Ok(())
    }

    #[test]
    fn test_same_seed_same_selection() -> anyhow::Result<()> {
        let (x, y) = data();
        let space = SearchSpace {
            subsample: vec![0.5, 1.0],
            max_depth: vec![1, 2, 3],
            ..tiny_space()
        };
        let run = || {
            SearchDriver::new(
                GbdtTrainer::new(),
                space.clone(),
                BoosterParams::default(),
                KFold::new(4).unwrap(),
                5,
            )
            .run(&x, &y)
        };
        let first = run()?;
        let second = run()?;
        for (a, b) in first.trials.iter().zip(&second.trials) {
            assert_eq!(a.candidate, b.candidate);
            assert_eq!(a.outcome, b.outcome);
            assert_eq!(a.rank, b.rank);
        }
        assert_eq!(first.best_index, second.best_index);
        assert_eq!(first.model.fingerprint()?, second.model.fingerprint()?);
        Ok(())
    }
}
