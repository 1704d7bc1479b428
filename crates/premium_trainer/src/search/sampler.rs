//! Strategies that turn a search space into candidate configurations

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::space::{Candidate, SearchSpace};

/// Produces the configurations a search evaluates, in evaluation order
pub trait ConfigSampler: Send + Sync {
    fn name(&self) -> &'static str;

    fn sample(&self, space: &SearchSpace, n: usize) -> Vec<Candidate>;
}

/// Independent uniform draw per hyperparameter. Duplicates are possible,
/// as with any sampling with replacement.
#[derive(Debug, Clone, Copy)]
pub struct RandomSampler {
    seed: u64,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl ConfigSampler for RandomSampler {
    fn name(&self) -> &'static str {
        "random"
    }

    fn sample(&self, space: &SearchSpace, n: usize) -> Vec<Candidate> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let dims = space.dimensions();
        if dims.contains(&0) {
            return Vec::new();
        }
        (0..n)
            .map(|_| {
                let mut idx = [0usize; 8];
                for (slot, &len) in idx.iter_mut().zip(dims.iter()) {
                    *slot = rng.gen_range(0..len);
                }
                space.candidate(idx)
            })
            .collect()
    }
}

/// Cartesian product in declaration order, the last parameter varying
/// fastest; `n` caps how many configurations are taken
#[derive(Debug, Clone, Copy, Default)]
pub struct GridSampler;

impl ConfigSampler for GridSampler {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn sample(&self, space: &SearchSpace, n: usize) -> Vec<Candidate> {
        let dims = space.dimensions();
        let total = space.size();
        (0..total.min(n))
            .map(|mut flat| {
                let mut idx = [0usize; 8];
                for (slot, &len) in idx.iter_mut().zip(dims.iter()).rev() {
                    *slot = flat % len;
                    flat /= len;
                }
                space.candidate(idx)
            })
            .collect()
    }
}
