//! World configuration, validation, and error types.
//!
//! [`WorldConfig`] is the builder-input for [`World::new`](crate::World::new).
//! [`validate()`](WorldConfig::validate) checks structural invariants;
//! out-of-range thread counts are not errors and are clamped by
//! [`resolve_thread_count`](WorldConfig::resolve_thread_count).

use thiserror::Error;

/// Seed used when none is supplied.
pub const DEFAULT_SEED: u64 = 0xfeed_beef;

/// Workers allowed per hardware thread.
pub const DEFAULT_OVERTHREADING_LIMIT: usize = 8;

/// Hard ceiling on the worker pool size.
pub const DEFAULT_MAX_THREADS: usize = 256;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`WorldConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `overthreading_limit` is zero.
    #[error("overthreading_limit must be at least 1")]
    ZeroOverthreadingLimit,
    /// `max_threads` is zero.
    #[error("max_threads must be at least 1")]
    ZeroThreadCeiling,
}

// ── WorldConfig ────────────────────────────────────────────────────

/// Configuration for constructing a [`World`](crate::World).
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Requested worker count. 0 runs every tick on the calling thread.
    /// Negative values are clamped to 0 with a warning.
    pub thread_count: i64,
    /// Seed of the world random engine. Default: `0xfeedbeef`.
    pub seed: u64,
    /// Let `spawn` replace a live entity instead of desyncing.
    pub allow_relaxed_spawn: bool,
    /// Workers allowed per hardware thread. Default: 8.
    pub overthreading_limit: usize,
    /// Absolute worker ceiling. Default: 256.
    pub max_threads: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            thread_count: 0,
            seed: DEFAULT_SEED,
            allow_relaxed_spawn: false,
            overthreading_limit: DEFAULT_OVERTHREADING_LIMIT,
            max_threads: DEFAULT_MAX_THREADS,
        }
    }
}

impl WorldConfig {
    /// Builder-style thread count setter.
    pub fn with_threads(mut self, thread_count: i64) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Builder-style seed setter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overthreading_limit == 0 {
            return Err(ConfigError::ZeroOverthreadingLimit);
        }
        if self.max_threads == 0 {
            return Err(ConfigError::ZeroThreadCeiling);
        }
        Ok(())
    }

    /// Largest worker count these limits allow on this machine.
    pub fn thread_limit(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .max(1);
        cpus.saturating_mul(self.overthreading_limit)
            .min(self.max_threads)
    }

    /// Clamp `requested` into `[0, thread_limit()]`, warning on change.
    pub fn resolve_thread_count(&self, requested: i64) -> usize {
        if requested < 0 {
            tracing::warn!(requested, "negative thread count, using 0");
            return 0;
        }
        let limit = self.thread_limit();
        let requested = usize::try_from(requested).unwrap_or(usize::MAX);
        if requested > limit {
            tracing::warn!(requested, limit, "thread count above limit, clamped");
            return limit;
        }
        requested
    }

    /// The configured `thread_count` after clamping.
    pub fn resolved_thread_count(&self) -> usize {
        self.resolve_thread_count(self.thread_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_single_threaded() {
        let cfg = WorldConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.resolved_thread_count(), 0);
        assert_eq!(cfg.seed, DEFAULT_SEED);
        assert!(!cfg.allow_relaxed_spawn);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let cfg = WorldConfig {
            overthreading_limit: 0,
            ..WorldConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroOverthreadingLimit));

        let cfg = WorldConfig {
            max_threads: 0,
            ..WorldConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroThreadCeiling));
    }

    #[test]
    fn negative_thread_count_clamps_to_zero() {
        let cfg = WorldConfig::default().with_threads(-5);
        assert_eq!(cfg.resolved_thread_count(), 0);
    }

    #[test]
    fn oversized_thread_count_clamps_to_limit() {
        let cfg = WorldConfig {
            max_threads: 3,
            ..WorldConfig::default()
        };
        assert_eq!(cfg.thread_limit(), 3);
        assert_eq!(cfg.resolve_thread_count(1_000_000), 3);
        assert_eq!(cfg.resolve_thread_count(2), 2);
    }

    #[test]
    fn limit_scales_with_overthreading() {
        let cfg = WorldConfig {
            overthreading_limit: 1,
            max_threads: usize::MAX,
            ..WorldConfig::default()
        };
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(cfg.thread_limit(), cpus);
    }
}
