//! The impact abstraction: a polymorphic unit of state change.

use std::sync::Arc;

use kairos_core::{EntityId, EventOrder, ImpactMeta, Time};

use crate::access::WorldAccess;

/// A unit of deterministic state change.
///
/// Implementors embed an [`ImpactMeta`] and expose it through
/// [`meta`](Impact::meta) / [`meta_mut`](Impact::meta_mut); every other
/// header accessor is provided.
///
/// `perform` runs exactly once per queueing, possibly on any worker
/// thread. It must not block on other impacts of the same phase. A
/// synchronous impact receives a sync [`WorldAccess`]; an asynchronous
/// one receives an async handle and must commute with its peers.
pub trait Impact: Send + Sync + 'static {
    /// Header of this impact.
    fn meta(&self) -> &ImpactMeta;

    /// Mutable header, used by producers before queueing.
    fn meta_mut(&mut self) -> &mut ImpactMeta;

    /// Apply the impact to the world.
    fn perform(&self, world: &WorldAccess<'_>);

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Sync queue key.
    fn order(&self) -> EventOrder {
        self.meta().order
    }

    /// Timeline time, if stamped.
    fn time(&self) -> Option<Time> {
        self.meta().time
    }

    /// Originating entity, if any.
    fn actor(&self) -> Option<EntityId> {
        self.meta().actor
    }

    /// Whether this impact goes to the unordered queue.
    fn is_async(&self) -> bool {
        self.meta().is_async
    }

    /// Replace the sync queue key.
    fn set_order(&mut self, order: EventOrder) {
        self.meta_mut().order = order;
    }

    /// Stamp the timeline time.
    fn set_time(&mut self, time: Time) {
        self.meta_mut().time = Some(time);
    }

    /// Set the originating entity.
    fn set_actor(&mut self, actor: EntityId) {
        self.meta_mut().actor = Some(actor);
    }

    /// Route to the unordered (`true`) or ordered (`false`) queue.
    fn set_async(&mut self, is_async: bool) {
        self.meta_mut().is_async = is_async;
    }
}

/// Impacts as stored in queues and solver history.
pub type SharedImpact = Arc<dyn Impact>;

/// Removes its actor from the world.
///
/// Synchronous, since removal needs a sync handle.
#[derive(Clone, Debug)]
pub struct SelfDestruct {
    meta: ImpactMeta,
}

impl SelfDestruct {
    /// Destroy `actor` at `order`.
    pub fn new(actor: EntityId, order: EventOrder) -> Self {
        Self {
            meta: ImpactMeta::sync().with_actor(actor).with_order(order),
        }
    }
}

impl Impact for SelfDestruct {
    fn meta(&self) -> &ImpactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ImpactMeta {
        &mut self.meta
    }

    fn perform(&self, world: &WorldAccess<'_>) {
        match self.meta.actor {
            Some(actor) => world.remove(actor),
            None => tracing::warn!("self-destruct without an actor"),
        }
    }
}
