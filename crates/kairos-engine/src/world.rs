//! The entity pool, its queues, and the tick protocol.
//!
//! [`WorldCore`] is the state shared by every worker: the slot pool of
//! entities, the sorted list of dynamic ids, the ordered sync queue, the
//! unordered async queue, and the pull cursors workers use to share out
//! each sequence exactly once per phase. All of it sits behind one
//! coarse `RwLock` that is held only for the duration of each call.
//!
//! [`World`] owns a `WorldCore` together with the [`Scheduler`] that
//! drives it.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use kairos_arena::{EntityState, SlotPool};
use kairos_core::{EntityHandle, EntityId, KindId};
use parking_lot::{Mutex, RwLock};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::access::{AccessMode, EntityAccess, WorldAccess};
use crate::config::{ConfigError, WorldConfig};
use crate::entity::Entity;
use crate::impact::{Impact, SharedImpact};
use crate::metrics::{Counters, WorldMetrics};
use crate::scheduler::Scheduler;

// ── Pool ───────────────────────────────────────────────────────────

/// Everything guarded by the world lock.
struct Pool {
    entities: SlotPool<Arc<Entity>>,
    /// Sorted ids of entities whose committed dynamic flag is set.
    dynamic_ids: Vec<EntityId>,
    /// Sorted by eventorder; equal orders keep arrival order.
    sync_queue: Vec<SharedImpact>,
    async_queue: Vec<SharedImpact>,
    sync_cursor: usize,
    async_cursor: usize,
    dynamic_cursor: usize,
    entity_cursor: usize,
    root: Option<EntityId>,
    allow_relaxed_spawn: bool,
}

impl Pool {
    fn new(allow_relaxed_spawn: bool) -> Self {
        Self {
            entities: SlotPool::new(),
            dynamic_ids: Vec::new(),
            sync_queue: Vec::new(),
            async_queue: Vec::new(),
            sync_cursor: 0,
            async_cursor: 0,
            dynamic_cursor: 0,
            entity_cursor: 0,
            root: None,
            allow_relaxed_spawn,
        }
    }

    fn add_dynamic(&mut self, id: EntityId) {
        if let Err(at) = self.dynamic_ids.binary_search(&id) {
            self.dynamic_ids.insert(at, id);
        }
    }

    fn erase_dynamic(&mut self, id: EntityId) {
        if let Ok(at) = self.dynamic_ids.binary_search(&id) {
            self.dynamic_ids.remove(at);
        }
    }
}

// ── WorldCore ──────────────────────────────────────────────────────

/// Shared world state: entity pool, queues, cursors, and random engine.
pub struct WorldCore {
    pool: RwLock<Pool>,
    desync: AtomicBool,
    seed: AtomicU64,
    rng: Mutex<ChaCha8Rng>,
    counters: Counters,
}

impl WorldCore {
    /// An empty world seeded with `seed`.
    pub fn new(seed: u64, allow_relaxed_spawn: bool) -> Self {
        Self {
            pool: RwLock::new(Pool::new(allow_relaxed_spawn)),
            desync: AtomicBool::new(false),
            seed: AtomicU64::new(seed),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            counters: Counters::default(),
        }
    }

    // ── entity pool ────────────────────────────────────────────────

    /// Spawn `entity` at `id`, or at the lowest free id when `None`.
    ///
    /// Reusing a live id desyncs and returns `None` unless relaxed spawn
    /// is allowed, in which case the occupant is replaced. An explicit id
    /// too far past the end of the pool also desyncs and returns `None`.
    pub fn spawn(&self, entity: Entity, id: Option<EntityId>) -> Option<EntityId> {
        let dynamic = self.read_dynamic(&entity, "spawn");
        let mut pool = self.pool.write();
        let id = id.unwrap_or(EntityId(pool.entities.next_free() as u32));

        if pool.entities.is_occupied(id.index()) {
            if !pool.allow_relaxed_spawn {
                drop(pool);
                tracing::error!(%id, "spawn: id is not free");
                self.desync();
                return None;
            }
            pool.erase_dynamic(id);
        }

        if let Err(err) = pool.entities.insert_at(id.index(), Arc::new(entity)) {
            drop(pool);
            tracing::error!(%id, %err, "spawn: id out of reach");
            self.desync();
            return None;
        }
        if dynamic {
            pool.add_dynamic(id);
        }
        Some(id)
    }

    /// Like [`spawn`](Self::spawn) but always replaces a live occupant.
    /// Only an out-of-reach id fails.
    pub fn emplace(&self, entity: Entity, id: Option<EntityId>) -> Option<EntityId> {
        let dynamic = self.read_dynamic(&entity, "emplace");
        let mut pool = self.pool.write();
        let id = id.unwrap_or(EntityId(pool.entities.next_free() as u32));
        if pool.entities.is_occupied(id.index()) {
            pool.erase_dynamic(id);
        }
        if let Err(err) = pool.entities.insert_at(id.index(), Arc::new(entity)) {
            drop(pool);
            tracing::error!(%id, %err, "emplace: id out of reach");
            self.desync();
            return None;
        }
        if dynamic {
            pool.add_dynamic(id);
        }
        Some(id)
    }

    /// Occupy a slot with a blank placeholder entity.
    pub fn reserve(&self, id: Option<EntityId>) -> Option<EntityId> {
        self.spawn(Entity::inert(EntityState::default()), id)
    }

    /// Remove the entity at `id`.
    ///
    /// An id beyond the pool desyncs. An empty slot desyncs only when
    /// relaxed spawn is allowed.
    pub fn remove(&self, id: EntityId) {
        let mut pool = self.pool.write();
        if id.index() >= pool.entities.capacity() {
            drop(pool);
            tracing::error!(%id, "remove: invalid entity id");
            self.desync();
            return;
        }
        if pool.entities.take(id.index()).is_some() {
            pool.erase_dynamic(id);
            if pool.root == Some(id) {
                pool.root = None;
            }
        } else if pool.allow_relaxed_spawn {
            drop(pool);
            tracing::error!(%id, "remove: no entity");
            self.desync();
        }
    }

    /// Re-evaluate dynamic membership of `id` from its committed state.
    pub fn respawn(&self, id: EntityId) {
        let Some(entity) = self.entity(id) else {
            return;
        };
        let dynamic = self.read_dynamic(&entity, "respawn");
        let mut pool = self.pool.write();
        // The slot may have been replaced while unlocked.
        let same = pool
            .entities
            .get(id.index())
            .is_some_and(|current| Arc::ptr_eq(current, &entity));
        if !same {
            return;
        }
        pool.erase_dynamic(id);
        if dynamic {
            pool.add_dynamic(id);
        }
        drop(pool);
        Counters::bump(&self.counters.respawns);
    }

    /// Drop every entity, dynamic id, and queued impact, forget the root,
    /// and clear the desync flag.
    pub fn clear(&self) {
        let mut pool = self.pool.write();
        pool.entities.clear();
        pool.dynamic_ids.clear();
        pool.sync_queue.clear();
        pool.async_queue.clear();
        pool.sync_cursor = 0;
        pool.async_cursor = 0;
        pool.dynamic_cursor = 0;
        pool.entity_cursor = 0;
        pool.root = None;
        self.desync.store(false, Ordering::Release);
        tracing::debug!("world cleared");
    }

    /// The entity at `id`.
    pub fn entity(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.pool.read().entities.get(id.index()).cloned()
    }

    /// Whether `id` holds an entity.
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.pool.read().entities.is_occupied(id.index())
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.pool.read().entities.live()
    }

    /// Every live entity in id order.
    pub fn entities(&self) -> Vec<(EntityId, Arc<Entity>)> {
        self.pool
            .read()
            .entities
            .iter()
            .map(|(i, e)| (EntityId(i as u32), Arc::clone(e)))
            .collect()
    }

    /// Generation-scoped handle for the entity at `id`.
    pub fn handle(&self, id: EntityId) -> Option<EntityHandle> {
        let pool = self.pool.read();
        pool.entities
            .is_occupied(id.index())
            .then(|| EntityHandle::new(id, pool.entities.generation(id.index())))
    }

    /// The entity a handle refers to, unless it has since been removed
    /// or replaced.
    pub fn resolve(&self, handle: EntityHandle) -> Option<Arc<Entity>> {
        let pool = self.pool.read();
        let index = handle.id().index();
        if pool.entities.generation(index) != handle.generation() {
            return None;
        }
        pool.entities.get(index).cloned()
    }

    /// Ids of live entities of `kind`.
    pub fn select(&self, kind: KindId) -> Vec<EntityId> {
        self.pool
            .read()
            .entities
            .iter()
            .filter(|(_, e)| e.kind() == kind)
            .map(|(i, _)| EntityId(i as u32))
            .collect()
    }

    /// Ids of dynamic entities of `kind`.
    pub fn select_dynamic(&self, kind: KindId) -> Vec<EntityId> {
        let pool = self.pool.read();
        pool.dynamic_ids
            .iter()
            .copied()
            .filter(|id| {
                pool.entities
                    .get(id.index())
                    .is_some_and(|e| e.kind() == kind)
            })
            .collect()
    }

    /// Sorted ids of dynamic entities.
    pub fn dynamic_ids(&self) -> Vec<EntityId> {
        self.pool.read().dynamic_ids.clone()
    }

    /// The designated root entity.
    pub fn root(&self) -> Option<EntityId> {
        self.pool.read().root
    }

    /// Designate the root entity.
    pub fn set_root(&self, id: Option<EntityId>) {
        self.pool.write().root = id;
    }

    /// Allow or forbid spawning over a live id.
    pub fn allow_relaxed_spawn(&self, allowed: bool) {
        self.pool.write().allow_relaxed_spawn = allowed;
    }

    /// Whether spawning over a live id is allowed.
    pub fn is_relaxed_spawn_allowed(&self) -> bool {
        self.pool.read().allow_relaxed_spawn
    }

    fn read_dynamic(&self, entity: &Entity, op: &'static str) -> bool {
        match entity.is_dynamic() {
            Ok(dynamic) => dynamic,
            Err(err) => {
                tracing::error!(op, %err, "cannot read dynamic flag");
                if err.is_timeout() {
                    self.desync();
                }
                false
            }
        }
    }

    // ── queues ─────────────────────────────────────────────────────

    /// Route `impact` to the sync queue (by order) or the async queue.
    pub fn queue(&self, impact: SharedImpact) {
        let mut pool = self.pool.write();
        if impact.is_async() {
            pool.async_queue.push(impact);
            return;
        }
        let order = impact.order();
        let mut at = pool.sync_queue.partition_point(|queued| queued.order() <= order);
        // Never slot in behind the cursor of a drain in progress.
        if at < pool.sync_cursor {
            tracing::debug!(%order, "sync impact ordered before the drain cursor, runs next");
            at = pool.sync_cursor;
        }
        pool.sync_queue.insert(at, impact);
    }

    /// Number of queued sync and async impacts.
    pub fn queue_len(&self) -> (usize, usize) {
        let pool = self.pool.read();
        (pool.sync_queue.len(), pool.async_queue.len())
    }

    // ── cursors ────────────────────────────────────────────────────

    /// Next unperformed sync impact of this phase.
    pub fn next_sync_impact(&self) -> Option<SharedImpact> {
        let mut pool = self.pool.write();
        let next = pool.sync_queue.get(pool.sync_cursor).cloned()?;
        pool.sync_cursor += 1;
        Some(next)
    }

    /// Next unperformed async impact of this phase.
    pub fn next_async_impact(&self) -> Option<SharedImpact> {
        let mut pool = self.pool.write();
        let next = pool.async_queue.get(pool.async_cursor).cloned()?;
        pool.async_cursor += 1;
        Some(next)
    }

    /// Next dynamic entity of this phase.
    pub fn next_dynamic_entity(&self) -> Option<(EntityId, Arc<Entity>)> {
        let mut pool = self.pool.write();
        while let Some(&id) = pool.dynamic_ids.get(pool.dynamic_cursor) {
            pool.dynamic_cursor += 1;
            if let Some(entity) = pool.entities.get(id.index()) {
                return Some((id, Arc::clone(entity)));
            }
        }
        None
    }

    /// Next live entity of this phase, skipping empty slots.
    pub fn next_entity(&self) -> Option<(EntityId, Arc<Entity>)> {
        let mut pool = self.pool.write();
        let (index, entity) = pool
            .entities
            .next_occupied(pool.entity_cursor)
            .map(|(i, e)| (i, Arc::clone(e)))?;
        pool.entity_cursor = index + 1;
        Some((EntityId(index as u32), entity))
    }

    /// Rewind every cursor to the start.
    pub fn reset_index(&self) {
        let mut pool = self.pool.write();
        pool.sync_cursor = 0;
        pool.async_cursor = 0;
        pool.dynamic_cursor = 0;
        pool.entity_cursor = 0;
    }

    /// Drop sync impacts already handed out and rewind the cursor.
    pub fn clean_sync_queue(&self) {
        let mut pool = self.pool.write();
        let done = pool.sync_cursor.min(pool.sync_queue.len());
        pool.sync_queue.drain(..done);
        pool.sync_cursor = 0;
    }

    /// Drop async impacts already handed out and rewind the cursor.
    pub fn clean_async_queue(&self) {
        let mut pool = self.pool.write();
        let done = pool.async_cursor.min(pool.async_queue.len());
        pool.async_queue.drain(..done);
        pool.async_cursor = 0;
    }

    /// Whether both queues are empty.
    pub fn no_queue(&self) -> bool {
        let pool = self.pool.read();
        pool.sync_queue.is_empty() && pool.async_queue.is_empty()
    }

    // ── desync ─────────────────────────────────────────────────────

    /// Flag the world as inconsistent. Sticky until [`clear`](Self::clear).
    pub fn desync(&self) {
        if !self.desync.swap(true, Ordering::AcqRel) {
            Counters::bump(&self.counters.desync_events);
            tracing::warn!("world desynced");
        }
    }

    /// Whether the world is flagged inconsistent.
    pub fn is_desync(&self) -> bool {
        self.desync.load(Ordering::Acquire)
    }

    // ── random ─────────────────────────────────────────────────────

    /// Seed of the random engine.
    pub fn seed(&self) -> u64 {
        self.seed.load(Ordering::Acquire)
    }

    /// Reset the random engine to `seed`.
    pub fn reseed(&self, seed: u64) {
        self.seed.store(seed, Ordering::Release);
        *self.rng.lock() = ChaCha8Rng::seed_from_u64(seed);
    }

    pub(crate) fn random_u64(&self) -> u64 {
        self.rng.lock().next_u64()
    }

    pub(crate) fn random_range(&self, range: Range<i64>) -> i64 {
        if range.is_empty() {
            tracing::warn!(?range, "empty random range");
            return range.start;
        }
        self.rng.lock().random_range(range)
    }

    // ── tick phases ────────────────────────────────────────────────

    /// Cumulative counters.
    pub fn metrics(&self) -> WorldMetrics {
        self.counters.snapshot()
    }

    /// Perform every sync impact in order with a sync handle.
    pub(crate) fn drain_sync(&self) {
        let access = WorldAccess::new(self, AccessMode::Sync);
        while let Some(impact) = self.next_sync_impact() {
            tracing::trace!(name = impact.name(), order = %impact.order(), "sync impact");
            impact.perform(&access);
            Counters::bump(&self.counters.sync_impacts);
        }
    }

    /// Pull and perform async impacts until the cursor is exhausted.
    pub(crate) fn drain_async(&self) {
        let access = WorldAccess::new(self, AccessMode::Async);
        while let Some(impact) = self.next_async_impact() {
            impact.perform(&access);
            Counters::bump(&self.counters.async_impacts);
        }
    }

    /// Pull dynamic entities and tick those whose clock fires.
    pub(crate) fn tick_dynamic(&self) {
        let world = WorldAccess::new(self, AccessMode::Async);
        while let Some((id, entity)) = self.next_dynamic_entity() {
            let access = EntityAccess::new(self, id, Arc::clone(&entity), AccessMode::Async);
            if access.settle(entity.clock()).unwrap_or(false) {
                entity.behavior().tick(&access, &world);
                Counters::bump(&self.counters.entity_ticks);
            }
        }
    }

    /// Pull live entities and commit their deltas.
    pub(crate) fn adjust_all(&self) {
        while let Some((id, entity)) = self.next_entity() {
            match entity.adjust() {
                Ok(out) => {
                    if out.changed {
                        Counters::bump(&self.counters.commits);
                    }
                    if out.dynamic_changed {
                        self.respawn(id);
                    }
                }
                Err(err) => {
                    tracing::error!(entity = %id, %err, "adjust failed");
                    if err.is_timeout() {
                        self.desync();
                    }
                }
            }
        }
    }

    /// One full tick on the calling thread.
    pub(crate) fn run_tick(&self) {
        while !self.no_queue() {
            self.drain_sync();
            self.clean_sync_queue();
            self.drain_async();
            self.clean_async_queue();
        }
        self.tick_dynamic();
        self.reset_index();
        self.adjust_all();
        self.reset_index();
        self.finish_tick();
    }

    pub(crate) fn finish_tick(&self) {
        Counters::bump(&self.counters.ticks);
    }
}

// Compile-time assertion: the core is shared by every worker.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<WorldCore>();
};

// ── World ──────────────────────────────────────────────────────────

/// A world together with the worker pool that ticks it.
///
/// Dropping the world stops and joins every worker.
pub struct World {
    core: Arc<WorldCore>,
    scheduler: Scheduler,
    config: WorldConfig,
}

impl World {
    /// Validate `config` and build an empty world.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let core = Arc::new(WorldCore::new(config.seed, config.allow_relaxed_spawn));
        let threads = config.resolved_thread_count();
        let scheduler = Scheduler::new(Arc::clone(&core), threads);
        Ok(Self {
            core,
            scheduler,
            config,
        })
    }

    /// A single-threaded world with default settings.
    pub fn single_threaded() -> Self {
        let config = WorldConfig::default();
        let core = Arc::new(WorldCore::new(config.seed, config.allow_relaxed_spawn));
        let scheduler = Scheduler::new(Arc::clone(&core), 0);
        Self {
            core,
            scheduler,
            config,
        }
    }

    /// Shared state, including the cursor API.
    pub fn core(&self) -> &Arc<WorldCore> {
        &self.core
    }

    /// A capability handle for code driving the world from outside a
    /// tick.
    pub fn access(&self, mode: AccessMode) -> WorldAccess<'_> {
        WorldAccess::new(&self.core, mode)
    }

    /// The entity at `id`, bound to this world with a sync handle.
    pub fn entity(&self, id: EntityId) -> Option<EntityAccess<'_>> {
        self.core
            .entity(id)
            .map(|entity| EntityAccess::new(&self.core, id, entity, AccessMode::Sync))
    }

    /// Whether `id` holds an entity.
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.core.has_entity(id)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.core.entity_count()
    }

    /// See [`WorldCore::spawn`].
    pub fn spawn(&self, entity: Entity, id: Option<EntityId>) -> Option<EntityId> {
        self.core.spawn(entity, id)
    }

    /// See [`WorldCore::emplace`].
    pub fn emplace(&self, entity: Entity, id: Option<EntityId>) -> Option<EntityId> {
        self.core.emplace(entity, id)
    }

    /// See [`WorldCore::reserve`].
    pub fn reserve(&self, id: Option<EntityId>) -> Option<EntityId> {
        self.core.reserve(id)
    }

    /// See [`WorldCore::remove`].
    pub fn remove(&self, id: EntityId) {
        self.core.remove(id);
    }

    /// See [`WorldCore::respawn`].
    pub fn respawn(&self, id: EntityId) {
        self.core.respawn(id);
    }

    /// See [`WorldCore::clear`].
    pub fn clear(&self) {
        self.core.clear();
    }

    /// Queue an impact.
    pub fn queue(&self, impact: impl Impact) {
        self.core.queue(Arc::new(impact));
    }

    /// Queue an already shared impact.
    pub fn queue_shared(&self, impact: SharedImpact) {
        self.core.queue(impact);
    }

    /// Whether the world is flagged inconsistent.
    pub fn is_desync(&self) -> bool {
        self.core.is_desync()
    }

    /// Reset the random engine.
    pub fn reseed(&self, seed: u64) {
        self.core.reseed(seed);
    }

    /// Seed of the random engine.
    pub fn seed(&self) -> u64 {
        self.core.seed()
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> WorldMetrics {
        self.core.metrics()
    }

    // ── ticking ────────────────────────────────────────────────────

    /// Request `delta` more ticks. Returns immediately unless the world
    /// is single-threaded.
    pub fn schedule(&self, delta: u64) {
        self.scheduler.schedule(delta);
    }

    /// Block until every scheduled tick has run.
    pub fn join(&self) {
        self.scheduler.join();
    }

    /// Run `delta` ticks and wait for them.
    pub fn tick(&self, delta: u64) {
        self.schedule(delta);
        self.join();
    }

    /// Resize the worker pool. Pending ticks finish first; out-of-range
    /// requests are clamped with a warning.
    pub fn set_thread_count(&mut self, requested: i64) {
        let threads = self.config.resolve_thread_count(requested);
        self.scheduler.set_thread_count(threads);
        self.config.thread_count = threads as i64;
    }

    /// Current worker count.
    pub fn thread_count(&self) -> usize {
        self.scheduler.thread_count()
    }

    /// Stop every worker at its next phase boundary. Ticks still pending
    /// are abandoned; [`set_thread_count`](Self::set_thread_count)
    /// starts a fresh pool.
    pub fn set_done(&self) {
        self.scheduler.set_done();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::single_threaded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_arena::SetDef;
    use kairos_core::{EventOrder, ImpactMeta, SetId};
    use parking_lot::Mutex as PlMutex;

    fn dynamic_entity() -> Entity {
        Entity::inert(EntityState::default().with_dynamic(true))
    }

    fn plain_entity() -> Entity {
        Entity::inert(EntityState::new([SetDef::new(SetId(16), 0)]))
    }

    /// Records its tag into a shared log when performed.
    struct Tag {
        meta: ImpactMeta,
        tag: u32,
        log: Arc<PlMutex<Vec<u32>>>,
    }

    impl Impact for Tag {
        fn meta(&self) -> &ImpactMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut ImpactMeta {
            &mut self.meta
        }
        fn perform(&self, _world: &WorldAccess<'_>) {
            self.log.lock().push(self.tag);
        }
    }

    fn tag(order: &[u64], tag: u32, log: &Arc<PlMutex<Vec<u32>>>) -> SharedImpact {
        Arc::new(Tag {
            meta: ImpactMeta::sync().with_order(EventOrder::from_path(order).unwrap()),
            tag,
            log: Arc::clone(log),
        })
    }

    // ── spawn / remove ─────────────────────────────────────────────

    #[test]
    fn auto_ids_fill_from_zero() {
        let core = WorldCore::new(1, false);
        assert_eq!(core.spawn(plain_entity(), None), Some(EntityId(0)));
        assert_eq!(core.spawn(plain_entity(), None), Some(EntityId(1)));
        assert_eq!(core.entity_count(), 2);
    }

    #[test]
    fn spawn_on_live_id_desyncs() {
        let core = WorldCore::new(1, false);
        core.spawn(plain_entity(), Some(EntityId(3)));
        assert_eq!(core.spawn(plain_entity(), Some(EntityId(3))), None);
        assert!(core.is_desync());
        assert_eq!(core.metrics().desync_events, 1);
    }

    #[test]
    fn relaxed_spawn_replaces_and_fixes_dynamic_ids() {
        let core = WorldCore::new(1, true);
        core.spawn(dynamic_entity(), Some(EntityId(0)));
        assert_eq!(core.dynamic_ids(), vec![EntityId(0)]);
        assert_eq!(core.spawn(plain_entity(), Some(EntityId(0))), Some(EntityId(0)));
        assert!(core.dynamic_ids().is_empty());
        assert!(!core.is_desync());
    }

    #[test]
    fn remove_rewinds_next_id() {
        let core = WorldCore::new(1, false);
        for _ in 0..3 {
            core.spawn(plain_entity(), None);
        }
        core.remove(EntityId(1));
        assert!(!core.has_entity(EntityId(1)));
        assert_eq!(core.spawn(plain_entity(), None), Some(EntityId(1)));
        assert_eq!(core.spawn(plain_entity(), None), Some(EntityId(3)));
    }

    #[test]
    fn remove_out_of_range_desyncs() {
        let core = WorldCore::new(1, false);
        core.remove(EntityId(10));
        assert!(core.is_desync());
    }

    #[test]
    fn remove_empty_slot_desyncs_only_when_relaxed() {
        let strict = WorldCore::new(1, false);
        strict.spawn(plain_entity(), Some(EntityId(2)));
        strict.remove(EntityId(0));
        assert!(!strict.is_desync());

        let relaxed = WorldCore::new(1, true);
        relaxed.spawn(plain_entity(), Some(EntityId(2)));
        relaxed.remove(EntityId(0));
        assert!(relaxed.is_desync());
    }

    #[test]
    fn stale_handles_do_not_resolve() {
        let core = WorldCore::new(1, false);
        let id = core.spawn(plain_entity(), None).unwrap();
        let handle = core.handle(id).unwrap();
        assert!(core.resolve(handle).is_some());
        core.remove(id);
        core.spawn(plain_entity(), Some(id));
        assert!(core.resolve(handle).is_none());
        assert!(core.resolve(core.handle(id).unwrap()).is_some());
    }

    #[test]
    fn clear_resets_everything() {
        let core = WorldCore::new(1, false);
        let id = core.spawn(dynamic_entity(), None).unwrap();
        core.set_root(Some(id));
        core.desync();
        core.clear();
        assert_eq!(core.entity_count(), 0);
        assert!(core.dynamic_ids().is_empty());
        assert_eq!(core.root(), None);
        assert!(!core.is_desync());
        assert_eq!(core.spawn(plain_entity(), None), Some(EntityId(0)));
    }

    #[test]
    fn select_filters_by_kind() {
        let core = WorldCore::new(1, false);
        let a = Entity::new(KindId(1), EntityState::default(), Arc::new(crate::Inert));
        let b = Entity::new(
            KindId(2),
            EntityState::default().with_dynamic(true),
            Arc::new(crate::Inert),
        );
        core.spawn(a.try_clone().unwrap(), None);
        core.spawn(b.try_clone().unwrap(), None);
        core.spawn(a, None);
        assert_eq!(core.select(KindId(1)), vec![EntityId(0), EntityId(2)]);
        assert_eq!(core.select_dynamic(KindId(2)), vec![EntityId(1)]);
        assert!(core.select_dynamic(KindId(1)).is_empty());
    }

    // ── dynamic membership ─────────────────────────────────────────

    #[test]
    fn adjust_flip_respawns_into_dynamic_ids() {
        let core = WorldCore::new(1, false);
        let id = core.spawn(plain_entity(), None).unwrap();
        let access = WorldAccess::new(&core, AccessMode::Sync);
        access.entity(id).unwrap().set_dynamic(true);
        assert!(core.dynamic_ids().is_empty());
        core.adjust_all();
        core.reset_index();
        assert_eq!(core.dynamic_ids(), vec![id]);
        assert_eq!(core.metrics().respawns, 1);
    }

    // ── queues and cursors ─────────────────────────────────────────

    #[test]
    fn sync_queue_runs_in_eventorder() {
        let core = WorldCore::new(1, false);
        let log = Arc::new(PlMutex::new(Vec::new()));
        core.queue(tag(&[3], 3, &log));
        core.queue(tag(&[1, 5], 15, &log));
        core.queue(tag(&[1], 1, &log));
        core.queue(tag(&[2], 2, &log));
        core.drain_sync();
        core.clean_sync_queue();
        assert_eq!(*log.lock(), vec![1, 15, 2, 3]);
        assert!(core.no_queue());
    }

    #[test]
    fn equal_orders_keep_arrival_order() {
        let core = WorldCore::new(1, false);
        let log = Arc::new(PlMutex::new(Vec::new()));
        for t in 0..4 {
            core.queue(tag(&[7], t, &log));
        }
        core.drain_sync();
        assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn clean_removes_only_handed_out_items() {
        let core = WorldCore::new(1, false);
        let log = Arc::new(PlMutex::new(Vec::new()));
        core.queue(tag(&[1], 1, &log));
        core.queue(tag(&[2], 2, &log));
        assert!(core.next_sync_impact().is_some());
        core.clean_sync_queue();
        assert_eq!(core.queue_len(), (1, 0));
        assert!(!core.no_queue());
    }

    #[test]
    fn next_entity_skips_holes() {
        let core = WorldCore::new(1, false);
        core.spawn(plain_entity(), Some(EntityId(1)));
        core.spawn(plain_entity(), Some(EntityId(4)));
        let ids: Vec<_> = std::iter::from_fn(|| core.next_entity().map(|(id, _)| id)).collect();
        assert_eq!(ids, vec![EntityId(1), EntityId(4)]);
        core.reset_index();
        assert_eq!(core.next_entity().map(|(id, _)| id), Some(EntityId(1)));
    }

    #[test]
    fn next_dynamic_entity_walks_dynamic_ids() {
        let core = WorldCore::new(1, false);
        core.spawn(plain_entity(), None);
        core.spawn(dynamic_entity(), None);
        core.spawn(dynamic_entity(), None);
        let ids: Vec<_> =
            std::iter::from_fn(|| core.next_dynamic_entity().map(|(id, _)| id)).collect();
        assert_eq!(ids, vec![EntityId(1), EntityId(2)]);
    }

    // ── access modes ───────────────────────────────────────────────

    #[test]
    fn async_handle_cannot_spawn_or_draw() {
        let core = WorldCore::new(1, false);
        let access = WorldAccess::new(&core, AccessMode::Async);
        assert_eq!(access.spawn(plain_entity(), None), None);
        assert_eq!(access.random_u64(), None);
        assert_eq!(core.entity_count(), 0);
    }

    #[test]
    fn read_only_handle_cannot_queue() {
        let core = WorldCore::new(1, false);
        let log = Arc::new(PlMutex::new(Vec::new()));
        let access = WorldAccess::new(&core, AccessMode::ReadOnly);
        access.queue_shared(tag(&[1], 1, &log));
        access.desync();
        assert!(core.no_queue());
        assert!(!core.is_desync());
    }

    #[test]
    fn read_only_entity_handle_cannot_write() {
        let core = WorldCore::new(1, false);
        let id = core.spawn(plain_entity(), None).unwrap();
        let entity = WorldAccess::new(&core, AccessMode::ReadOnly)
            .entity(id)
            .unwrap();
        assert_eq!(entity.mode(), AccessMode::ReadOnly);
        entity.set(2, 42);
        entity.apply_delta(2, 5);
        entity.vec_add(&[1]);
        entity.bytes_resize(4);
        entity.adjust();
        assert!(entity.entity().is_none());
        assert!(!entity.is_changed());
        assert_eq!(entity.get(2), 0);
        assert_eq!(entity.vec_len(), 0);
        assert_eq!(entity.bytes_len(), 0);
        assert!(!core.is_desync());
    }

    #[test]
    fn async_entity_handle_writes_deltas_but_cannot_commit() {
        let core = WorldCore::new(1, false);
        let id = core.spawn(plain_entity(), None).unwrap();
        let entity = WorldAccess::new(&core, AccessMode::Async)
            .entity(id)
            .unwrap();
        entity.apply_delta(2, 5);
        entity.adjust();
        entity.vec_resize(3);
        entity.set_clock(9);
        assert!(!entity.clock());
        assert_eq!(entity.get(2), 0);
        assert_eq!(entity.vec_len(), 0);
        assert!(entity.is_changed());

        let owner = WorldAccess::new(&core, AccessMode::Sync).entity(id).unwrap();
        owner.adjust();
        assert_eq!(owner.get(2), 5);
    }

    #[test]
    fn reseed_replays_random_sequence() {
        let core = WorldCore::new(5, false);
        let access = WorldAccess::new(&core, AccessMode::Sync);
        let first: Vec<_> = (0..4).map(|_| access.random_u64()).collect();
        core.reseed(5);
        let second: Vec<_> = (0..4).map(|_| access.random_u64()).collect();
        assert_eq!(first, second);
        assert_eq!(access.random_range(3..3), Some(3));
        let r = access.random_range(-2..2).unwrap();
        assert!((-2..2).contains(&r));
    }

    // ── single-threaded tick ───────────────────────────────────────

    #[test]
    fn single_threaded_tick_commits_impacts() {
        let world = World::single_threaded();
        let id = world.spawn(plain_entity(), None).unwrap();
        world.entity(id).unwrap().apply_delta(2, 7);
        world.tick(1);
        assert_eq!(world.entity(id).unwrap().get(2), 7);
        assert_eq!(world.metrics().ticks, 1);
        assert_eq!(world.thread_count(), 0);
    }
}
