//! Strongly-typed identifiers and the [`Time`] alias.

use std::fmt;

/// Logical timeline time, measured in ticks.
pub type Time = u64;

/// Identifies an entity slot within a world.
///
/// Ids are 0-based slot indices. A removed id may be handed out again
/// by a later spawn; use [`EntityHandle`] when staleness matters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The slot index this id addresses.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Generation-scoped reference to an entity slot.
///
/// The world bumps a slot's generation every time its occupant is
/// removed or replaced, so a handle taken before that point no longer
/// resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct EntityHandle {
    id: EntityId,
    generation: u32,
}

impl EntityHandle {
    /// Create a handle for `id` at `generation`.
    pub fn new(id: EntityId, generation: u32) -> Self {
        Self { id, generation }
    }

    /// The slot id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The slot generation this handle was taken at.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.generation)
    }
}

/// Stable semantic key of a scalar set inside an entity.
///
/// Ids below [`SetId::FIRST_USER`] are reserved by the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub u32);

impl SetId {
    /// Committed non-zero value means the entity ticks itself.
    pub const IS_DYNAMIC: SetId = SetId(1);
    /// Number of ticks between two self-ticks.
    pub const TICK_PERIOD: SetId = SetId(2);
    /// Smallest id available to entity kinds.
    pub const FIRST_USER: SetId = SetId(16);

    /// Whether this id is reserved by the kernel.
    pub fn is_reserved(self) -> bool {
        self < Self::FIRST_USER
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SetId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Tag naming a concrete entity kind (its prototype).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KindId(pub u16);

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for KindId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}
