//! Solver configuration.

use kairos_engine::config::DEFAULT_SEED;

/// Configuration for constructing a [`Solver`](crate::Solver).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    /// Seed applied to the world whenever it leaves time 0.
    /// Default: `0xfeedbeef`.
    pub seed: u64,
    /// Accept impacts stamped before the current time by rewinding.
    /// Default: `false`.
    pub allow_rewind: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            allow_rewind: false,
        }
    }
}

impl SolverConfig {
    /// Builder-style seed setter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder-style rewind setter.
    pub fn with_rewind(mut self, allow: bool) -> Self {
        self.allow_rewind = allow;
        self
    }
}
