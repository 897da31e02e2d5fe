//! Delta-buffered row storage and generational slots for Kairos.
//!
//! Entity state is kept as rows of `{value, delta}` pairs. Writers only
//! ever touch `delta`, so concurrent writers commute; `value` changes
//! exclusively in [`EntityState::adjust`], which folds the pending deltas
//! in at the end of a tick.
//!
//! ```text
//! EntityState
//! ├── sets:  SetRow[]  {id, scale, value, delta}, sorted by id
//! ├── bytes: Row<i8>[]
//! ├── vec:   Row<i64>[]
//! └── ChangedRanges × 3 (which rows adjust() must commit)
//! ```
//!
//! [`SlotPool`] is the sparse, generation-tracked slot vector the world
//! uses to own entities.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod ranges;
pub mod rows;
pub mod slots;
pub mod state;

pub use error::{RowError, SlotError};
pub use ranges::ChangedRanges;
pub use rows::{Row, RowKind, SetDef, SetRow};
pub use slots::SlotPool;
pub use state::{Adjusted, EntityState};
