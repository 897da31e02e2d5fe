//! Row types for the three entity buffers.

use std::fmt;

use kairos_core::SetId;

/// Names one of the three buffers of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// Scalar sets.
    Sets,
    /// The `i8` byte buffer.
    Bytes,
    /// The `i64` vector buffer.
    Vec,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sets => write!(f, "sets"),
            Self::Bytes => write!(f, "bytes"),
            Self::Vec => write!(f, "vec"),
        }
    }
}

/// Declaration of a scalar set, used when building an entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetDef {
    /// Semantic key.
    pub id: SetId,
    /// Fixed-point divisor, fixed for the lifetime of the entity.
    pub scale: i64,
    /// Initial committed value.
    pub value: i64,
}

impl SetDef {
    /// A set with unit scale.
    pub fn new(id: SetId, value: i64) -> Self {
        Self { id, scale: 1, value }
    }

    /// A set with an explicit fixed-point scale.
    pub fn scaled(id: SetId, scale: i64, value: i64) -> Self {
        Self { id, scale, value }
    }
}

/// A committed scalar with its pending delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetRow {
    /// Semantic key.
    pub id: SetId,
    /// Fixed-point divisor.
    pub scale: i64,
    /// Committed value.
    pub value: i64,
    /// Pending change, folded in by `adjust()`.
    pub delta: i64,
}

impl From<SetDef> for SetRow {
    fn from(def: SetDef) -> Self {
        Self {
            id: def.id,
            scale: def.scale,
            value: def.value,
            delta: 0,
        }
    }
}

/// A committed buffer element with its pending delta.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Row<T> {
    /// Committed value.
    pub value: T,
    /// Pending change.
    pub delta: T,
}

/// Wrapping arithmetic shared by the `i8` and `i64` buffers.
pub(crate) trait Wrapping: Copy + Default + PartialOrd {
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
}

impl Wrapping for i8 {
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }
}

impl Wrapping for i64 {
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }
}

impl<T: Wrapping> Row<T> {
    /// A row whose value only appears after the next commit.
    pub(crate) fn pending(value: T) -> Self {
        Self {
            value: T::default(),
            delta: value,
        }
    }

    /// The value this row will hold after the next commit.
    #[inline]
    pub(crate) fn projected(&self) -> T {
        self.value.add(self.delta)
    }

    #[inline]
    pub(crate) fn commit(&mut self) {
        self.value = self.value.add(self.delta);
        self.delta = T::default();
    }
}
