//! Kairos: a deterministic, multithreaded simulation kernel.
//!
//! This is the facade crate that re-exports the public API of every
//! Kairos sub-crate.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use kairos::prelude::*;
//!
//! // Adds 1 to its first user set on every tick.
//! struct Ticker;
//! impl Behavior for Ticker {
//!     fn tick(&self, entity: &EntityAccess<'_>, _world: &WorldAccess<'_>) {
//!         entity.apply_delta(2, 1);
//!     }
//! }
//!
//! let state = EntityState::new([SetDef::new(SetId(16), 0)])
//!     .with_dynamic(true)
//!     .with_tick_period(10);
//! let world = World::new(WorldConfig::default().with_threads(4)).unwrap();
//! let id = world
//!     .spawn(Entity::new(KindId(1), state, Arc::new(Ticker)), None)
//!     .unwrap();
//!
//! world.tick(100);
//! assert_eq!(world.entity(id).unwrap().get(2), 10);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `kairos-core` | Ids, eventorder, impact header |
//! | [`state`] | `kairos-arena` | Delta-buffered entity state, slot pool |
//! | [`engine`] | `kairos-engine` | World, scheduler, entities, impacts, loader |
//! | [`solver`] | `kairos-solver` | Timeline solver with rewind-and-replay |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Ids, [`types::EventOrder`], and [`types::ImpactMeta`] (`kairos-core`).
pub use kairos_core as types;

/// Entity state rows and the generational slot pool (`kairos-arena`).
pub use kairos_arena as state;

/// World, worker pool, entities, and impacts (`kairos-engine`).
///
/// [`engine::World`] is the entry point; simulation code sees it through
/// [`engine::WorldAccess`] and [`engine::EntityAccess`].
pub use kairos_engine as engine;

/// Time-sorted impact history with rewind (`kairos-solver`).
pub use kairos_solver as solver;

/// Common imports for typical Kairos usage.
///
/// ```rust
/// use kairos::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use kairos_core::{EntityHandle, EntityId, EventOrder, ImpactMeta, KindId, SetId, Time};

    // State
    pub use kairos_arena::{EntityState, SetDef};

    // Engine
    pub use kairos_engine::{
        AccessMode, Behavior, Entity, EntityAccess, Impact, PrototypeRegistry, SelfDestruct,
        SharedImpact, World, WorldAccess, WorldConfig,
    };

    // Solver
    pub use kairos_solver::{Solver, SolverConfig, Timeline};

    // Errors
    pub use kairos_engine::{ConfigError, EntityError, LoaderError};
    pub use kairos_solver::SolverError;
}
