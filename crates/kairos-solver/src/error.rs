//! Error types for the solver.

use kairos_core::Time;
use thiserror::Error;

/// Errors from [`Solver`](crate::Solver) operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The impact predates the current time and rewinding is off.
    /// The impact was dropped.
    #[error("impact at time {impact_time} predates current time {current_time} and rewind is disallowed")]
    RewindDisallowed {
        /// Time stamped on the impact.
        impact_time: Time,
        /// Solver time when it arrived.
        current_time: Time,
    },
    /// The decoder rejected an encoded impact.
    #[error("cannot decode impact from {len} bytes")]
    DecodeFailed {
        /// Payload length.
        len: usize,
    },
    /// An encoded impact arrived before a decoder was installed.
    #[error("no impact decoder installed")]
    NoDecoder,
}
