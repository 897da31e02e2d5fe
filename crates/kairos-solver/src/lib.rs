//! Timeline solver for the Kairos simulation kernel.
//!
//! A [`Solver`] keeps a time-sorted history of impacts and drives a
//! [`Timeline`] (normally a [`World`](kairos_engine::World)) through it.
//! Impacts that arrive for a time the world has already passed trigger a
//! rewind: the world is reset to time 0, reseeded, and the whole history
//! is replayed with the late impact spliced in. Given the same history
//! and seed, replay reproduces the original state exactly.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod hash;
pub mod solver;
pub mod timeline;

pub use config::SolverConfig;
pub use error::SolverError;
pub use hash::world_hash;
pub use solver::{Decoder, Solver};
pub use timeline::Timeline;
