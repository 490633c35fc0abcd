use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dagbelief_algebra::DEFAULT_EPSILON;

/// Above how many highest-nodes a diamond's conditioning falls back to PIE
/// instead of enumerating every `2^|H|` assignment.
pub const DEFAULT_MAX_ENUM_HIGHEST: usize = 10;

/// Tunables for a `compute_beliefs` call. Construct with `ComputeOptions::new`
/// and chain the setters that differ from the default; everything else
/// inherits a sensible value the way `DiamondsArgs` does in the CLI layer
/// this crate grew out of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComputeOptions {
    pub max_enum_highest: usize,
    pub epsilon: f64,
    pub parallelism: usize,
}

impl ComputeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_enum_highest(mut self, max_enum_highest: usize) -> Self {
        self.max_enum_highest = max_enum_highest;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            max_enum_highest: DEFAULT_MAX_ENUM_HIGHEST,
            epsilon: DEFAULT_EPSILON,
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// A cooperative cancellation flag, checked between layers and between a
/// diamond's conditioning sub-problems. Cloning shares the same underlying
/// flag; `cancel()` is safe to call from any thread, including one watching
/// a deadline unrelated to the computation itself.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
