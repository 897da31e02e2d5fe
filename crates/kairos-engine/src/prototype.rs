//! Registry of entity templates keyed by kind.

use indexmap::IndexMap;
use kairos_core::KindId;

use crate::entity::Entity;

/// Template entities, one per kind, in registration order.
#[derive(Debug, Default)]
pub struct PrototypeRegistry {
    prototypes: IndexMap<KindId, Entity>,
}

impl PrototypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `prototype` under its own kind, replacing any earlier
    /// template of that kind.
    pub fn register(&mut self, prototype: Entity) {
        let kind = prototype.kind();
        if self.prototypes.insert(kind, prototype).is_some() {
            tracing::warn!(kind = kind.0, "prototype replaced");
        }
    }

    /// A fresh copy of the template for `kind`.
    pub fn spawn(&self, kind: KindId) -> Option<Entity> {
        let Some(prototype) = self.prototypes.get(&kind) else {
            tracing::warn!(kind = kind.0, "unknown prototype");
            return None;
        };
        match prototype.try_clone() {
            Ok(entity) => Some(entity),
            Err(err) => {
                tracing::error!(kind = kind.0, %err, "prototype copy failed");
                None
            }
        }
    }

    /// The template for `kind`.
    pub fn get(&self, kind: KindId) -> Option<&Entity> {
        self.prototypes.get(&kind)
    }

    /// Registered kinds in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = KindId> + '_ {
        self.prototypes.keys().copied()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_arena::{EntityState, SetDef};
    use kairos_core::SetId;
    use std::sync::Arc;

    use crate::behavior::Inert;

    fn proto(kind: u16, hp: i64) -> Entity {
        Entity::new(
            KindId(kind),
            EntityState::new([SetDef::new(SetId(16), hp)]),
            Arc::new(Inert),
        )
    }

    #[test]
    fn kinds_keep_registration_order() {
        let mut reg = PrototypeRegistry::new();
        reg.register(proto(9, 1));
        reg.register(proto(2, 1));
        reg.register(proto(5, 1));
        let kinds: Vec<_> = reg.kinds().collect();
        assert_eq!(kinds, vec![KindId(9), KindId(2), KindId(5)]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn spawned_copies_are_independent() {
        let mut reg = PrototypeRegistry::new();
        reg.register(proto(1, 40));
        let a = reg.spawn(KindId(1)).unwrap();
        a.apply_delta(2, 2).unwrap();
        a.adjust().unwrap();
        assert_eq!(a.get(2), Ok(42));
        assert_eq!(reg.get(KindId(1)).unwrap().get(2), Ok(40));
        assert_eq!(reg.spawn(KindId(1)).unwrap().kind(), KindId(1));
    }

    #[test]
    fn unknown_kind_is_none_and_reregistering_replaces() {
        let mut reg = PrototypeRegistry::new();
        assert!(reg.spawn(KindId(3)).is_none());
        reg.register(proto(3, 1));
        reg.register(proto(3, 7));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(KindId(3)).unwrap().get(2), Ok(7));
    }
}
