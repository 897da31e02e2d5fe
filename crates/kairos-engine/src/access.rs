//! Capability-scoped handles onto a world and its entities.
//!
//! Simulation code never touches [`WorldCore`] directly. Impacts and
//! behaviours receive a [`WorldAccess`] whose [`AccessMode`] limits what
//! they may do, and reach entities through [`EntityAccess`], which turns
//! every entity failure into the kernel's soft-failure policy: a logged
//! no-op, a default value, and for lock timeouts a world desync.

use std::ops::Range;
use std::sync::Arc;

use kairos_core::{EntityId, KindId};

use crate::entity::{Entity, EntityError};
use crate::impact::{Impact, SharedImpact};
use crate::world::WorldCore;

/// What a [`WorldAccess`] handle may do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Read entities only.
    ReadOnly,
    /// Read entities, queue impacts, and flag desync.
    Async,
    /// Everything, including spawning, removal, and random draws.
    Sync,
}

impl AccessMode {
    /// Whether a handle in this mode may perform an operation that
    /// requires `needed`.
    pub fn permits(self, needed: AccessMode) -> bool {
        match needed {
            AccessMode::ReadOnly => true,
            AccessMode::Async => self != AccessMode::ReadOnly,
            AccessMode::Sync => self == AccessMode::Sync,
        }
    }
}

/// World handle passed to impacts and behaviours.
#[derive(Clone, Copy)]
pub struct WorldAccess<'w> {
    core: &'w WorldCore,
    mode: AccessMode,
}

impl<'w> WorldAccess<'w> {
    /// Wrap `core` with the given capability.
    pub fn new(core: &'w WorldCore, mode: AccessMode) -> Self {
        Self { core, mode }
    }

    /// The capability of this handle.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Whether this handle may mutate the entity pool.
    pub fn is_sync(&self) -> bool {
        self.mode == AccessMode::Sync
    }

    fn allow(&self, needed: AccessMode, op: &'static str) -> bool {
        let ok = self.mode.permits(needed);
        if !ok {
            tracing::warn!(op, mode = ?self.mode, "world operation not permitted");
        }
        ok
    }

    // ── reads ──────────────────────────────────────────────────────

    /// The entity at `id`, with the capability of this handle.
    pub fn entity(&self, id: EntityId) -> Option<EntityAccess<'w>> {
        self.core
            .entity(id)
            .map(|entity| EntityAccess::new(self.core, id, entity, self.mode))
    }

    /// Whether `id` holds an entity.
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.core.has_entity(id)
    }

    /// Ids of live entities of `kind`.
    pub fn select(&self, kind: KindId) -> Vec<EntityId> {
        self.core.select(kind)
    }

    /// Ids of dynamic entities of `kind`.
    pub fn select_dynamic(&self, kind: KindId) -> Vec<EntityId> {
        self.core.select_dynamic(kind)
    }

    /// The designated root entity.
    pub fn root(&self) -> Option<EntityId> {
        self.core.root()
    }

    /// Whether the world is flagged inconsistent.
    pub fn is_desync(&self) -> bool {
        self.core.is_desync()
    }

    // ── async operations ───────────────────────────────────────────

    /// Queue an impact for this or the next phase.
    pub fn queue(&self, impact: impl Impact) {
        self.queue_shared(Arc::new(impact));
    }

    /// Queue an already shared impact.
    pub fn queue_shared(&self, impact: SharedImpact) {
        if self.allow(AccessMode::Async, "queue") {
            self.core.queue(impact);
        }
    }

    /// Flag the world as inconsistent.
    pub fn desync(&self) {
        if self.allow(AccessMode::Async, "desync") {
            self.core.desync();
        }
    }

    // ── sync operations ────────────────────────────────────────────

    /// Spawn `entity` at `id`, or at the next free id.
    pub fn spawn(&self, entity: Entity, id: Option<EntityId>) -> Option<EntityId> {
        if !self.allow(AccessMode::Sync, "spawn") {
            return None;
        }
        self.core.spawn(entity, id)
    }

    /// Occupy a slot with a blank placeholder.
    pub fn reserve(&self, id: Option<EntityId>) -> Option<EntityId> {
        if !self.allow(AccessMode::Sync, "reserve") {
            return None;
        }
        self.core.reserve(id)
    }

    /// Remove the entity at `id`.
    pub fn remove(&self, id: EntityId) {
        if self.allow(AccessMode::Sync, "remove") {
            self.core.remove(id);
        }
    }

    /// Re-evaluate dynamic membership of `id`.
    pub fn respawn(&self, id: EntityId) {
        if self.allow(AccessMode::Sync, "respawn") {
            self.core.respawn(id);
        }
    }

    /// Drop every entity and queued impact.
    pub fn clear(&self) {
        if self.allow(AccessMode::Sync, "clear") {
            self.core.clear();
        }
    }

    /// Designate the root entity.
    pub fn set_root(&self, id: Option<EntityId>) {
        if self.allow(AccessMode::Sync, "set_root") {
            self.core.set_root(id);
        }
    }

    /// Next value of the world random engine.
    pub fn random_u64(&self) -> Option<u64> {
        self.allow(AccessMode::Sync, "random_u64")
            .then(|| self.core.random_u64())
    }

    /// Uniform draw from `range` using the world random engine.
    pub fn random_range(&self, range: Range<i64>) -> Option<i64> {
        self.allow(AccessMode::Sync, "random_range")
            .then(|| self.core.random_range(range))
    }
}

/// An entity bound to its owning world.
///
/// Every method follows the soft-failure policy: failures are logged,
/// reads return a default, writes are dropped, and lock timeouts flag
/// the world as desynced.
///
/// The handle carries the [`AccessMode`] it was obtained with. Reads are
/// always allowed. Delta writers need [`AccessMode::Async`]. Anything
/// that changes committed state or row layout before the commit phase
/// (`adjust`, the clock, resizes, inserts and erases) needs
/// [`AccessMode::Sync`]. A refused call logs a warning and does nothing.
#[derive(Clone)]
pub struct EntityAccess<'w> {
    core: &'w WorldCore,
    id: EntityId,
    entity: Arc<Entity>,
    mode: AccessMode,
}

impl<'w> EntityAccess<'w> {
    pub(crate) fn new(
        core: &'w WorldCore,
        id: EntityId,
        entity: Arc<Entity>,
        mode: AccessMode,
    ) -> Self {
        Self {
            core,
            id,
            entity,
            mode,
        }
    }

    /// Slot id of this entity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Kind tag of this entity.
    pub fn kind(&self) -> KindId {
        self.entity.kind()
    }

    /// The capability of this handle.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// The underlying entity, for the raw `Result` API. Only a sync
    /// handle exposes it.
    pub fn entity(&self) -> Option<&Arc<Entity>> {
        self.allow(AccessMode::Sync, "entity").then_some(&self.entity)
    }

    fn allow(&self, needed: AccessMode, op: &'static str) -> bool {
        let ok = self.mode.permits(needed);
        if !ok {
            tracing::warn!(entity = %self.id, op, mode = ?self.mode, "entity operation not permitted");
        }
        ok
    }

    pub(crate) fn settle<T>(&self, result: Result<T, EntityError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::error!(entity = %self.id, %err, "entity operation failed");
                if err.is_timeout() {
                    self.core.desync();
                }
                None
            }
        }
    }

    // ── sets ───────────────────────────────────────────────────────

    /// Row index of the set `id`.
    pub fn index_of(&self, set: kairos_core::SetId) -> Option<usize> {
        self.settle(self.entity.read_with("index_of", |s| s.require_index(set)))
    }

    /// Committed value at `index`; 0 on failure.
    pub fn get(&self, index: usize) -> i64 {
        self.settle(self.entity.get(index)).unwrap_or(0)
    }

    /// Fixed-point scale at `index`; 0 on failure.
    pub fn scale(&self, index: usize) -> i64 {
        self.settle(self.entity.read_with("scale", |s| s.scale(index)))
            .unwrap_or(0)
    }

    /// Propose `value` at `index`.
    pub fn set(&self, index: usize, value: i64) {
        if !self.allow(AccessMode::Async, "set") {
            return;
        }
        self.settle(self.entity.set(index, value));
    }

    /// Add `delta` at `index`.
    pub fn apply_delta(&self, index: usize, delta: i64) {
        if !self.allow(AccessMode::Async, "apply_delta") {
            return;
        }
        self.settle(self.entity.apply_delta(index, delta));
    }

    /// Committed dynamic flag; `false` on failure.
    pub fn is_dynamic(&self) -> bool {
        self.settle(self.entity.is_dynamic()).unwrap_or(false)
    }

    /// Propose a new dynamic flag.
    pub fn set_dynamic(&self, dynamic: bool) {
        if !self.allow(AccessMode::Async, "set_dynamic") {
            return;
        }
        self.settle(self.entity.write_with("set_dynamic", |s| {
            s.set_dynamic(dynamic);
            Ok(())
        }));
    }

    /// Committed tick period; 0 on failure.
    pub fn tick_period(&self) -> i64 {
        self.settle(self.entity.read_with("tick_period", |s| Ok(s.tick_period())))
            .unwrap_or(0)
    }

    /// Propose a new tick period.
    pub fn set_tick_period(&self, period: i64) {
        if !self.allow(AccessMode::Async, "set_tick_period") {
            return;
        }
        self.settle(self.entity.write_with("set_tick_period", |s| {
            s.set_tick_period(period);
            Ok(())
        }));
    }

    /// Advance the countdown; `false` on failure or without a sync
    /// handle.
    pub fn clock(&self) -> bool {
        if !self.allow(AccessMode::Sync, "clock") {
            return false;
        }
        self.settle(self.entity.clock()).unwrap_or(false)
    }

    /// Overwrite the countdown.
    pub fn set_clock(&self, clock: i64) {
        if !self.allow(AccessMode::Sync, "set_clock") {
            return;
        }
        self.settle(self.entity.write_with("set_clock", |s| {
            s.set_clock(clock);
            Ok(())
        }));
    }

    /// Restart the countdown from the tick period.
    pub fn reset_clock(&self) {
        if !self.allow(AccessMode::Sync, "reset_clock") {
            return;
        }
        self.settle(self.entity.write_with("reset_clock", |s| {
            s.reset_clock();
            Ok(())
        }));
    }

    /// Whether any row has an uncommitted change; `false` on failure.
    pub fn is_changed(&self) -> bool {
        self.settle(self.entity.read_with("is_changed", |s| Ok(s.is_changed())))
            .unwrap_or(false)
    }

    /// Commit pending deltas, respawning through the world when the
    /// dynamic flag flips.
    pub fn adjust(&self) {
        if !self.allow(AccessMode::Sync, "adjust") {
            return;
        }
        if let Some(out) = self.settle(self.entity.adjust()) {
            if out.dynamic_changed {
                self.core.respawn(self.id);
            }
        }
    }

    // ── bytes ──────────────────────────────────────────────────────

    /// Number of byte rows.
    pub fn bytes_len(&self) -> usize {
        self.settle(self.entity.read_with("bytes_len", |s| Ok(s.bytes_len())))
            .unwrap_or(0)
    }

    /// Committed byte at `index`; 0 on failure.
    pub fn bytes_get(&self, index: usize) -> i8 {
        self.settle(self.entity.read_with("bytes_get", |s| s.bytes_get(index)))
            .unwrap_or(0)
    }

    /// Every committed byte.
    pub fn bytes_get_all(&self) -> Vec<i8> {
        self.settle(self.entity.read_with("bytes_get_all", |s| Ok(s.bytes_get_all())))
            .unwrap_or_default()
    }

    /// Committed bytes in a span; empty on failure.
    pub fn bytes_read(&self, offset: usize, count: usize) -> Vec<i8> {
        self.settle(self.entity.read_with("bytes_read", |s| s.bytes_read(offset, count)))
            .unwrap_or_default()
    }

    /// Propose `value` at `index`.
    pub fn bytes_set(&self, index: usize, value: i8) {
        if !self.allow(AccessMode::Async, "bytes_set") {
            return;
        }
        self.settle(self.entity.write_with("bytes_set", |s| s.bytes_set(index, value)));
    }

    /// Propose `values` starting at `offset`.
    pub fn bytes_write(&self, offset: usize, values: &[i8]) {
        if !self.allow(AccessMode::Async, "bytes_write") {
            return;
        }
        self.settle(self.entity.write_with("bytes_write", |s| s.bytes_write(offset, values)));
    }

    /// Add `delta` at `index`.
    pub fn bytes_apply_delta(&self, index: usize, delta: i8) {
        if !self.allow(AccessMode::Async, "bytes_apply_delta") {
            return;
        }
        self.settle(
            self.entity
                .write_with("bytes_apply_delta", |s| s.bytes_apply_delta(index, delta)),
        );
    }

    /// Add `deltas` starting at `offset`.
    pub fn bytes_write_delta(&self, offset: usize, deltas: &[i8]) {
        if !self.allow(AccessMode::Async, "bytes_write_delta") {
            return;
        }
        self.settle(
            self.entity
                .write_with("bytes_write_delta", |s| s.bytes_write_delta(offset, deltas)),
        );
    }

    /// Subtract `deltas` starting at `offset`.
    pub fn bytes_erase_delta(&self, offset: usize, deltas: &[i8]) {
        if !self.allow(AccessMode::Async, "bytes_erase_delta") {
            return;
        }
        self.settle(
            self.entity
                .write_with("bytes_erase_delta", |s| s.bytes_erase_delta(offset, deltas)),
        );
    }

    /// Grow or truncate the byte buffer.
    pub fn bytes_resize(&self, len: usize) {
        if !self.allow(AccessMode::Sync, "bytes_resize") {
            return;
        }
        self.settle(self.entity.write_with("bytes_resize", |s| {
            s.bytes_resize(len);
            Ok(())
        }));
    }

    // ── vec ────────────────────────────────────────────────────────

    /// Number of vec rows.
    pub fn vec_len(&self) -> usize {
        self.settle(self.entity.read_with("vec_len", |s| Ok(s.vec_len())))
            .unwrap_or(0)
    }

    /// Committed element at `index`; 0 on failure.
    pub fn vec_get(&self, index: usize) -> i64 {
        self.settle(self.entity.read_with("vec_get", |s| s.vec_get(index)))
            .unwrap_or(0)
    }

    /// Every committed element.
    pub fn vec_get_all(&self) -> Vec<i64> {
        self.settle(self.entity.read_with("vec_get_all", |s| Ok(s.vec_get_all())))
            .unwrap_or_default()
    }

    /// Committed elements in a span; empty on failure.
    pub fn vec_read(&self, offset: usize, count: usize) -> Vec<i64> {
        self.settle(self.entity.read_with("vec_read", |s| s.vec_read(offset, count)))
            .unwrap_or_default()
    }

    /// Propose `value` at `index`.
    pub fn vec_set(&self, index: usize, value: i64) {
        if !self.allow(AccessMode::Async, "vec_set") {
            return;
        }
        self.settle(self.entity.write_with("vec_set", |s| s.vec_set(index, value)));
    }

    /// Propose `values` starting at `offset`.
    pub fn vec_write(&self, offset: usize, values: &[i64]) {
        if !self.allow(AccessMode::Async, "vec_write") {
            return;
        }
        self.settle(self.entity.write_with("vec_write", |s| s.vec_write(offset, values)));
    }

    /// Add `delta` at `index`.
    pub fn vec_apply_delta(&self, index: usize, delta: i64) {
        if !self.allow(AccessMode::Async, "vec_apply_delta") {
            return;
        }
        self.settle(
            self.entity
                .write_with("vec_apply_delta", |s| s.vec_apply_delta(index, delta)),
        );
    }

    /// Add `deltas` starting at `offset`.
    pub fn vec_write_delta(&self, offset: usize, deltas: &[i64]) {
        if !self.allow(AccessMode::Async, "vec_write_delta") {
            return;
        }
        self.settle(
            self.entity
                .write_with("vec_write_delta", |s| s.vec_write_delta(offset, deltas)),
        );
    }

    /// Subtract `deltas` starting at `offset`.
    pub fn vec_erase_delta(&self, offset: usize, deltas: &[i64]) {
        if !self.allow(AccessMode::Async, "vec_erase_delta") {
            return;
        }
        self.settle(
            self.entity
                .write_with("vec_erase_delta", |s| s.vec_erase_delta(offset, deltas)),
        );
    }

    /// Grow or truncate the vec buffer.
    pub fn vec_resize(&self, len: usize) {
        if !self.allow(AccessMode::Sync, "vec_resize") {
            return;
        }
        self.settle(self.entity.write_with("vec_resize", |s| {
            s.vec_resize(len);
            Ok(())
        }));
    }

    /// Append `values`.
    pub fn vec_add(&self, values: &[i64]) {
        if !self.allow(AccessMode::Async, "vec_add") {
            return;
        }
        self.settle(self.entity.write_with("vec_add", |s| {
            s.vec_add(values);
            Ok(())
        }));
    }

    /// Insert a record in key order.
    pub fn vec_add_sorted(&self, record: &[i64]) {
        if !self.allow(AccessMode::Sync, "vec_add_sorted") {
            return;
        }
        self.settle(self.entity.write_with("vec_add_sorted", |s| {
            s.vec_add_sorted(record);
            Ok(())
        }));
    }

    /// Insert `values` before `index`.
    pub fn vec_insert(&self, index: usize, values: &[i64]) {
        if !self.allow(AccessMode::Sync, "vec_insert") {
            return;
        }
        self.settle(self.entity.write_with("vec_insert", |s| s.vec_insert(index, values)));
    }

    /// Remove `count` rows at `index`.
    pub fn vec_erase(&self, index: usize, count: usize) {
        if !self.allow(AccessMode::Sync, "vec_erase") {
            return;
        }
        self.settle(self.entity.write_with("vec_erase", |s| s.vec_erase(index, count)));
    }

    /// Remove the first record keyed by `value`.
    pub fn vec_erase_by_value(&self, value: i64, stride: usize) {
        if !self.allow(AccessMode::Sync, "vec_erase_by_value") {
            return;
        }
        self.settle(
            self.entity
                .write_with("vec_erase_by_value", |s| s.vec_erase_by_value(value, stride)),
        );
    }

    /// Remove the record keyed by `value` from a sorted buffer.
    pub fn vec_erase_by_value_sorted(&self, value: i64, stride: usize) {
        if !self.allow(AccessMode::Sync, "vec_erase_by_value_sorted") {
            return;
        }
        self.settle(self.entity.write_with("vec_erase_by_value_sorted", |s| {
            s.vec_erase_by_value_sorted(value, stride)
        }));
    }

    // ── behaviour dispatch ─────────────────────────────────────────

    /// Side-effect-free query; empty on failure.
    pub fn request(&self, id: u32, args: &[u8]) -> Vec<u8> {
        self.settle(self.entity.request(id, args)).unwrap_or_default()
    }

    /// Mutating command.
    pub fn modify(&self, id: u32, args: &[u8]) {
        if !self.allow(AccessMode::Async, "modify") {
            return;
        }
        self.settle(self.entity.modify(id, args));
    }
}
