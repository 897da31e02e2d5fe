//! Header data carried by every impact.

use crate::id::{EntityId, Time};
use crate::order::EventOrder;

/// Ordering, timing, and routing metadata of an impact.
///
/// The default header is asynchronous, unordered, untimed, and has no
/// actor. Synchronous impacts start from [`ImpactMeta::sync`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImpactMeta {
    /// Position in the sync queue.
    pub order: EventOrder,
    /// Timeline time; `None` until the solver stamps it.
    pub time: Option<Time>,
    /// Entity the impact originates from, if any.
    pub actor: Option<EntityId>,
    /// Asynchronous impacts go to the unordered queue.
    pub is_async: bool,
}

impl Default for ImpactMeta {
    fn default() -> Self {
        Self {
            order: EventOrder::default(),
            time: None,
            actor: None,
            is_async: true,
        }
    }
}

impl ImpactMeta {
    /// Header for a synchronous impact.
    pub fn sync() -> Self {
        Self {
            is_async: false,
            ..Self::default()
        }
    }

    /// Builder-style order setter.
    pub fn with_order(mut self, order: EventOrder) -> Self {
        self.order = order;
        self
    }

    /// Builder-style time setter.
    pub fn with_time(mut self, time: Time) -> Self {
        self.time = Some(time);
        self
    }

    /// Builder-style actor setter.
    pub fn with_actor(mut self, actor: EntityId) -> Self {
        self.actor = Some(actor);
        self
    }
}
