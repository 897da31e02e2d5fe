//! Core types for the Kairos simulation kernel.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! identifiers, the tree-structured [`EventOrder`] key, and the
//! [`ImpactMeta`] header every impact carries.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod impact;
pub mod order;

pub use error::OrderError;
pub use id::{EntityHandle, EntityId, KindId, SetId, Time};
pub use impact::ImpactMeta;
pub use order::EventOrder;
