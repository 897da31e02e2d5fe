//! World, scheduler, and loader of the Kairos simulation kernel.
//!
//! A [`World`] owns a pool of lockable [`Entity`] objects, an ordered
//! sync queue and an unordered async queue of [`Impact`]s, and a
//! [`Scheduler`] whose workers advance it through discrete ticks:
//!
//! ```text
//! drain-sync → drain-async → (repeat while queued) → tick-dynamic → adjust-all
//! ```
//!
//! Entity writes are deltas until `adjust-all` commits them, so async
//! impacts and dynamic entity ticks commute and a world produces the same
//! state regardless of worker count. Simulation code sees the world only
//! through capability handles ([`WorldAccess`], [`EntityAccess`]) which
//! log failures instead of returning errors and flag the world as
//! desynced on lock timeouts.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod barrier;
pub mod behavior;
pub mod config;
pub mod entity;
pub mod impact;
pub mod loader;
pub mod metrics;
pub mod prototype;
pub mod scheduler;
pub mod world;

pub use access::{AccessMode, EntityAccess, WorldAccess};
pub use barrier::PhaseBarrier;
pub use behavior::{Behavior, Inert};
pub use config::{ConfigError, WorldConfig};
pub use entity::{Entity, EntityError};
pub use impact::{Impact, SelfDestruct, SharedImpact};
pub use loader::{Loader, LoaderError};
pub use metrics::WorldMetrics;
pub use prototype::PrototypeRegistry;
pub use scheduler::Scheduler;
pub use world::{World, WorldCore};
