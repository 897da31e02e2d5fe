//! Per-kind entity behaviour.

use kairos_arena::EntityState;

use crate::access::{EntityAccess, WorldAccess};

/// The overridable part of an entity kind.
///
/// One behaviour instance is shared by every entity spawned from the
/// same prototype, so implementations keep per-entity data in the
/// entity's [`EntityState`], not in `self`.
pub trait Behavior: Send + Sync + 'static {
    /// Called when a dynamic entity's clock fires.
    ///
    /// `world` is an asynchronous handle: implementations read other
    /// entities and queue impacts, they do not spawn or remove.
    fn tick(&self, entity: &EntityAccess<'_>, world: &WorldAccess<'_>) {
        let _ = (entity, world);
    }

    /// Side-effect-free query keyed by `id`.
    fn request(&self, state: &EntityState, id: u32, args: &[u8]) -> Vec<u8> {
        let _ = (state, id, args);
        Vec::new()
    }

    /// Mutating command keyed by `id`. Implementations should only
    /// write deltas.
    fn modify(&self, state: &mut EntityState, id: u32, args: &[u8]) {
        let _ = (state, id, args);
    }
}

/// Behaviour of entities that never tick and ignore requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct Inert;

impl Behavior for Inert {}
