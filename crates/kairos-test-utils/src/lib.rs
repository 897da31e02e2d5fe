//! Test fixtures for Kairos development.
//!
//! Provides a counting entity kind ([`Counter`]), a few small impacts for
//! driving worlds from tests, and [`init_tracing`] for optional log
//! output.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::*;

/// Install a test subscriber at `TRACE` level. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
