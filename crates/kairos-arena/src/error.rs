//! Row and slot error types.

use kairos_core::SetId;
use thiserror::Error;

use crate::rows::RowKind;

/// Errors from [`EntityState`](crate::EntityState) operations.
///
/// Every failing operation leaves the state untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RowError {
    /// A row index was outside the buffer.
    #[error("invalid {kind} index {index} (len {len})")]
    InvalidIndex {
        /// Which buffer was addressed.
        kind: RowKind,
        /// The offending index.
        index: usize,
        /// Buffer length at the time of the call.
        len: usize,
    },
    /// A span `[offset, offset + count)` did not fit in the buffer.
    #[error("invalid {kind} range {offset}+{count} (len {len})")]
    InvalidRange {
        /// Which buffer was addressed.
        kind: RowKind,
        /// Start of the span.
        offset: usize,
        /// Length of the span.
        count: usize,
        /// Buffer length at the time of the call.
        len: usize,
    },
    /// No set with the given id exists.
    #[error("unknown set id {id}")]
    UnknownSet {
        /// The missing id.
        id: SetId,
    },
    /// A value lookup for a structural erase found no matching record.
    #[error("no vec record starting with value {value}")]
    ValueNotFound {
        /// The searched value.
        value: i64,
    },
    /// A record stride of zero was supplied.
    #[error("record stride must be non-zero")]
    ZeroStride,
}

/// Errors from [`SlotPool`](crate::SlotPool) operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SlotError {
    /// An explicit index lay too far past the end of the pool.
    #[error("slot {index} is out of reach (capacity {capacity}, max growth {max_growth})")]
    OutOfReach {
        /// The requested index.
        index: usize,
        /// Pool capacity at the time of the call.
        capacity: usize,
        /// The pool's growth limit.
        max_growth: usize,
    },
}
