//! Random draws used by the worker.
//!
//! The worker only ever asks for a uniform value in `[0, 1)` or an index into
//! the worklist, which keeps runs reproducible with [`RandomSampler::seeded`]
//! or fully scripted with [`ScriptedSampler`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of randomness for the worker.
pub trait Sampler: Send {
    /// A uniform draw from `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// A uniform index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;
}

/// [`Sampler`] backed by a [`StdRng`].
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Replays fixed values, then falls back to constants.
///
/// Handy in tests: `units` feeds both wait samples and failure rolls, in the
/// order the worker asks for them.
#[derive(Debug, Clone)]
pub struct ScriptedSampler {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
    fallback_unit: f64,
}

/// Empty script; every unit draw is 0.5 and every index is 0.
impl Default for ScriptedSampler {
    fn default() -> Self {
        Self {
            units: VecDeque::new(),
            indices: VecDeque::new(),
            fallback_unit: 0.5,
        }
    }
}

impl ScriptedSampler {
    pub fn new(units: impl IntoIterator<Item = f64>, indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            units: units.into_iter().collect(),
            indices: indices.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Value returned by [`Sampler::unit`] once the script is exhausted.
    pub fn with_fallback_unit(mut self, unit: f64) -> Self {
        self.fallback_unit = unit;
        self
    }
}

impl Sampler for ScriptedSampler {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }

    fn index(&mut self, len: usize) -> usize {
        let i = self.indices.pop_front().unwrap_or(0);
        if len == 0 {
            0
        } else {
            i % len
        }
    }
}
