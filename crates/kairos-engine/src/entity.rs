//! Lockable entity: an [`EntityState`] behind a timed `RwLock`.
//!
//! Every operation acquires the lock with a bounded wait
//! ([`Entity::DEFAULT_LOCK_TIMEOUT`] unless overridden). A timeout is
//! reported as [`EntityError::LockTimeout`]; the world-facing wrapper
//! [`EntityAccess`](crate::EntityAccess) turns it into a desync.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kairos_arena::{Adjusted, EntityState, RowError};
use kairos_core::KindId;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::behavior::{Behavior, Inert};

/// Errors from the raw [`Entity`] API.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The entity lock could not be acquired in time.
    #[error("{op}: entity lock timed out after {timeout:?}")]
    LockTimeout {
        /// Operation that was waiting.
        op: &'static str,
        /// The bound that expired.
        timeout: Duration,
    },
    /// The operation addressed rows that do not exist.
    #[error(transparent)]
    Row(#[from] RowError),
}

impl EntityError {
    /// Whether this error should flag the world as desynced.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

/// A lockable, delta-buffered bag of simulation state.
pub struct Entity {
    state: RwLock<EntityState>,
    behavior: Arc<dyn Behavior>,
    kind: KindId,
    lock_timeout: Duration,
}

impl Entity {
    /// Bound on every lock acquisition unless overridden.
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

    /// An entity of `kind` driven by `behavior`.
    pub fn new(kind: KindId, state: EntityState, behavior: Arc<dyn Behavior>) -> Self {
        Self {
            state: RwLock::new(state),
            behavior,
            kind,
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// A passive entity of the default kind.
    pub fn inert(state: EntityState) -> Self {
        Self::new(KindId::default(), state, Arc::new(Inert))
    }

    /// Override the lock timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Kind tag of this entity.
    pub fn kind(&self) -> KindId {
        self.kind
    }

    /// Shared behaviour.
    pub fn behavior(&self) -> &Arc<dyn Behavior> {
        &self.behavior
    }

    /// Lock acquisition bound.
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    // ── locking ────────────────────────────────────────────────────

    /// Acquire a shared guard within the timeout.
    pub fn read(&self, op: &'static str) -> Result<RwLockReadGuard<'_, EntityState>, EntityError> {
        self.state
            .try_read_for(self.lock_timeout)
            .ok_or(EntityError::LockTimeout {
                op,
                timeout: self.lock_timeout,
            })
    }

    /// Acquire an exclusive guard within the timeout.
    pub fn write(
        &self,
        op: &'static str,
    ) -> Result<RwLockWriteGuard<'_, EntityState>, EntityError> {
        self.state
            .try_write_for(self.lock_timeout)
            .ok_or(EntityError::LockTimeout {
                op,
                timeout: self.lock_timeout,
            })
    }

    /// Run `f` on the state under a shared guard.
    pub fn read_with<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&EntityState) -> Result<R, RowError>,
    ) -> Result<R, EntityError> {
        let guard = self.read(op)?;
        Ok(f(&guard)?)
    }

    /// Run `f` on the state under an exclusive guard.
    pub fn write_with<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut EntityState) -> Result<R, RowError>,
    ) -> Result<R, EntityError> {
        let mut guard = self.write(op)?;
        Ok(f(&mut guard)?)
    }

    // ── scalar operations ──────────────────────────────────────────

    /// Committed value at `index`.
    pub fn get(&self, index: usize) -> Result<i64, EntityError> {
        self.read_with("get", |s| s.get(index))
    }

    /// Propose `value` at `index`.
    pub fn set(&self, index: usize, value: i64) -> Result<(), EntityError> {
        self.write_with("set", |s| s.set(index, value))
    }

    /// Add `delta` at `index`.
    pub fn apply_delta(&self, index: usize, delta: i64) -> Result<(), EntityError> {
        self.write_with("apply_delta", |s| s.apply_delta(index, delta))
    }

    /// Committed dynamic flag.
    pub fn is_dynamic(&self) -> Result<bool, EntityError> {
        self.read_with("is_dynamic", |s| Ok(s.is_dynamic()))
    }

    /// Advance the tick countdown; `true` when a tick is due.
    pub fn clock(&self) -> Result<bool, EntityError> {
        self.write_with("clock", |s| Ok(s.clock()))
    }

    /// Commit every pending delta.
    pub fn adjust(&self) -> Result<Adjusted, EntityError> {
        self.write_with("adjust", |s| Ok(s.adjust()))
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> Result<EntityState, EntityError> {
        self.read_with("snapshot", |s| Ok(s.clone()))
    }

    // ── behaviour dispatch ─────────────────────────────────────────

    /// Dispatch a side-effect-free request to the behaviour.
    pub fn request(&self, id: u32, args: &[u8]) -> Result<Vec<u8>, EntityError> {
        let guard = self.read("request")?;
        Ok(self.behavior.request(&guard, id, args))
    }

    /// Dispatch a mutating command to the behaviour.
    pub fn modify(&self, id: u32, args: &[u8]) -> Result<(), EntityError> {
        let mut guard = self.write("modify")?;
        self.behavior.modify(&mut guard, id, args);
        Ok(())
    }

    /// Copy the state into a fresh lock; the behaviour is shared.
    pub fn try_clone(&self) -> Result<Self, EntityError> {
        let state = self.read("clone")?.clone();
        Ok(Self {
            state: RwLock::new(state),
            behavior: Arc::clone(&self.behavior),
            kind: self.kind,
            lock_timeout: self.lock_timeout,
        })
    }
}


impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind)
            .field("lock_timeout", &self.lock_timeout)
            .finish_non_exhaustive()
    }
}

// Compile-time assertion: entities are shared across worker threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Entity>();
};
