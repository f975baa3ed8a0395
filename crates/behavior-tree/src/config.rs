//! Tree configuration.

/// Settings applied to a [`Tree`](crate::Tree) at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeConfig {
    /// Seed for random branch selection. `None` seeds from system entropy.
    pub seed: Option<u64>,
    /// Maximum instructions dispatched in one tick before the tick is
    /// abandoned with [`RunError::StepLimit`](crate::RunError::StepLimit).
    /// `None` (default) or `Some(0)` never abandons a tick.
    pub step_limit: Option<usize>,
}

impl TreeConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the per-tick instruction budget; `0` clears it.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = (limit > 0).then_some(limit);
        self
    }

    /// The effective budget, treating a zero limit as unlimited.
    pub fn effective_step_limit(&self) -> Option<usize> {
        self.step_limit.filter(|&limit| limit > 0)
    }
}
