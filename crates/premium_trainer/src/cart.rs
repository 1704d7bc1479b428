//! Histogram-based CART builder
//!
//! Grows one regression tree from per-row gradients and hessians over binned
//! features. Split gain and leaf weights carry L1 (alpha) and L2 (lambda)
//! regularisation:
//!
//! - Gain = ½·[T(G_L)²/(H_L+λ) + T(G_R)²/(H_R+λ) − T(G)²/(H+λ)]
//! - Leaf = −T(G)/(H+λ)·η
//!
//! where T soft-thresholds a gradient sum by α.

use rayon::prelude::*;
use std::ops::{Add, AddAssign, Sub};

use crate::binning::{BinMapper, BinnedMatrix, MISSING_BIN};
use crate::tree::{Node, Tree};

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub gamma: f64,
    pub learning_rate: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            learning_rate: 0.3,
        }
    }
}

/// Gradient, hessian and row count of a set of rows
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct GradStats {
    g: f64,
    h: f64,
    n: usize,
}

impl Add for GradStats {
    type Output = GradStats;

    fn add(self, rhs: GradStats) -> GradStats {
        GradStats {
            g: self.g + rhs.g,
            h: self.h + rhs.h,
            n: self.n + rhs.n,
        }
    }
}

impl Sub for GradStats {
    type Output = GradStats;

    fn sub(self, rhs: GradStats) -> GradStats {
        GradStats {
            g: self.g - rhs.g,
            h: self.h - rhs.h,
            n: self.n - rhs.n,
        }
    }
}

impl AddAssign for GradStats {
    fn add_assign(&mut self, rhs: GradStats) {
        *self = *self + rhs;
    }
}

/// Split candidate: rows with bin <= `bin` go left, missing follows
/// `default_left`
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: usize,
    default_left: bool,
    gain: f64,
}

impl SplitCandidate {
    /// Higher gain wins; equal gains keep the lower feature, then the lower bin
    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain
            || (self.gain == other.gain && (self.feature, self.bin) < (other.feature, other.bin))
    }
}

/// L1 soft threshold
pub fn soft_threshold(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

/// Build a regression tree with histogram split finding
pub struct CartBuilder<'a> {
    bins: &'a BinnedMatrix,
    mapper: &'a BinMapper,
    gradients: &'a [f64],
    hessians: &'a [f64],
    features: &'a [usize],
    config: TreeConfig,
}

impl<'a> CartBuilder<'a> {
    /// `features` lists the columns this tree may split on
    pub fn new(
        bins: &'a BinnedMatrix,
        mapper: &'a BinMapper,
        gradients: &'a [f64],
        hessians: &'a [f64],
        features: &'a [usize],
        config: TreeConfig,
    ) -> Self {
        debug_assert_eq!(bins.n_rows(), gradients.len());
        debug_assert_eq!(bins.n_rows(), hessians.len());

        Self {
            bins,
            mapper,
            gradients,
            hessians,
            features,
            config,
        }
    }

    /// Build a tree over the given rows
    pub fn build(&self, rows: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(rows, 0, &mut nodes);
        Tree { nodes }
    }

    fn build_node(&self, rows: &[usize], depth: usize, nodes: &mut Vec<Node>) -> u32 {
        let current_idx = nodes.len() as u32;
        let total = self.sum(rows);
        let leaf_value = self.leaf_value(total);

        if depth >= self.config.max_depth || rows.len() < 2 {
            nodes.push(Node::leaf(leaf_value));
            return current_idx;
        }

        let split = match self.find_best_split(rows, total) {
            Some(s) => s,
            None => {
                nodes.push(Node::leaf(leaf_value));
                return current_idx;
            }
        };

        let (left_rows, right_rows) = self.split_rows(rows, &split);

        // Reserve space for current node
        nodes.push(Node {
            feature_index: split.feature as u32,
            threshold: self.mapper.threshold(split.feature, split.bin),
            default_left: split.default_left,
            left: 0,
            right: 0,
            value: None,
        });

        let left_idx = self.build_node(&left_rows, depth + 1, nodes);
        let right_idx = self.build_node(&right_rows, depth + 1, nodes);

        nodes[current_idx as usize].left = left_idx;
        nodes[current_idx as usize].right = right_idx;

        current_idx
    }

    /// Best split over the allowed features. Histograms are built in
    /// parallel; the reduction runs in feature order so ties resolve the
    /// same way on every run.
    fn find_best_split(&self, rows: &[usize], total: GradStats) -> Option<SplitCandidate> {
        let per_feature: Vec<Option<SplitCandidate>> = self
            .features
            .par_iter()
            .map(|&f| self.best_split_for_feature(rows, f, total))
            .collect();

        let mut best: Option<SplitCandidate> = None;
        for candidate in per_feature.into_iter().flatten() {
            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }
        best
    }

    fn histogram(&self, rows: &[usize], feature: usize) -> (Vec<GradStats>, GradStats) {
        let column = self.bins.column(feature);
        let mut hist = vec![GradStats::default(); self.mapper.n_bins(feature)];
        let mut missing = GradStats::default();

        for &row in rows {
            let stats = GradStats {
                g: self.gradients[row],
                h: self.hessians[row],
                n: 1,
            };
            match column[row] {
                MISSING_BIN => missing += stats,
                bin => hist[bin as usize] += stats,
            }
        }
        (hist, missing)
    }

    fn best_split_for_feature(
        &self,
        rows: &[usize],
        feature: usize,
        total: GradStats,
    ) -> Option<SplitCandidate> {
        let (hist, missing) = self.histogram(rows, feature);
        let mut best: Option<SplitCandidate> = None;
        let mut acc = GradStats::default();

        for (bin, stats) in hist.iter().enumerate() {
            acc += *stats;
            for default_left in [false, true] {
                if default_left && missing.n == 0 {
                    continue;
                }
                let left = if default_left { acc + missing } else { acc };
                let right = total - left;

                if left.n == 0 || right.n == 0 {
                    continue;
                }
                if left.h < self.config.min_child_weight || right.h < self.config.min_child_weight
                {
                    continue;
                }

                let gain = self.split_gain(left, right, total);
                // also rejects NaN gains
                if !(gain > self.config.gamma) {
                    continue;
                }
                if best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        bin,
                        default_left,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn split_rows(&self, rows: &[usize], split: &SplitCandidate) -> (Vec<usize>, Vec<usize>) {
        let column = self.bins.column(split.feature);
        rows.iter().copied().partition(|&row| match column[row] {
            MISSING_BIN => split.default_left,
            bin => bin as usize <= split.bin,
        })
    }

    fn score(&self, stats: GradStats) -> f64 {
        let denom = stats.h + self.config.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        let t = soft_threshold(stats.g, self.config.reg_alpha);
        t * t / denom
    }

    fn split_gain(&self, left: GradStats, right: GradStats, parent: GradStats) -> f64 {
        0.5 * (self.score(left) + self.score(right) - self.score(parent))
    }

    fn sum(&self, rows: &[usize]) -> GradStats {
        rows.iter().fold(GradStats::default(), |acc, &row| {
            acc + GradStats {
                g: self.gradients[row],
                h: self.hessians[row],
                n: 1,
            }
        })
    }

    fn leaf_value(&self, stats: GradStats) -> f64 {
        let denom = stats.h + self.config.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -soft_threshold(stats.g, self.config.reg_alpha) / denom * self.config.learning_rate
    }
}
