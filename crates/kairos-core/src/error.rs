//! Error types for core ordering primitives.

use thiserror::Error;

/// Errors from [`EventOrder`](crate::EventOrder) construction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The parent path is already at
    /// [`EventOrder::MAX_DEPTH`](crate::EventOrder::MAX_DEPTH); a child
    /// cannot be represented.
    #[error("eventorder depth {depth} is at the maximum, cannot spawn a child")]
    DepthExceeded {
        /// Depth of the parent path.
        depth: usize,
    },
}
