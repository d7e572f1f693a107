//! Injectable randomness for page sampling and shuffling.

use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of uniform random indices.
pub trait RandomSource: Send + Sync {
    /// A uniformly distributed value in `0..upper`. `upper` is at least 1.
    fn index(&self, upper: usize) -> usize;
}

/// Uniform value in the inclusive range `[low, high]`.
pub fn range_inclusive(random: &dyn RandomSource, low: u32, high: u32) -> u32 {
    debug_assert!(low <= high);
    low + random.index((high - low + 1) as usize) as u32
}

/// Fisher–Yates shuffle driven by `random`.
pub fn shuffle<T>(random: &dyn RandomSource, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = random.index(i + 1);
        items.swap(i, j);
    }
}

/// Thread-local RNG backed source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, upper: usize) -> usize {
        rand::rng().random_range(0..upper.max(1))
    }
}

/// Deterministic source replaying a script of values. Each value is clamped
/// to `upper - 1`; once the script runs out every draw returns `upper - 1`,
/// which makes [`shuffle`] the identity and [`range_inclusive`] return the
/// upper bound.
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    script: Mutex<VecDeque<usize>>,
    draws: Mutex<Vec<usize>>,
}

impl ScriptedRandom {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            draws: Mutex::new(Vec::new()),
        }
    }

    /// Source that always draws the maximum.
    pub fn highest() -> Self {
        Self::default()
    }

    /// Every `upper` requested so far, in order.
    pub fn draws(&self) -> Vec<usize> {
        self.draws.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl RandomSource for ScriptedRandom {
    fn index(&self, upper: usize) -> usize {
        let upper = upper.max(1);
        if let Ok(mut draws) = self.draws.lock() {
            draws.push(upper);
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or(upper - 1).min(upper - 1)
    }
}
