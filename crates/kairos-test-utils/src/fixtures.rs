//! Reusable entity and impact fixtures.
//!
//! - [`Counter`]: a dynamic entity kind that adds 1 to its counter set on
//!   every tick.
//! - [`AddDelta`]: adds to one row of one entity (async by default).
//! - [`SetValue`]: proposes a value for one row (sync, order matters).
//! - [`SpawnCounter`]: spawns a counter entity (sync).
//! - [`RandomDelta`]: adds a draw from the world random engine (sync).
//! - [`Fanout`]: queues ordered children from inside `perform`.
//! - [`Record`]: appends a tag to a shared log.

use std::sync::Arc;

use kairos_arena::{EntityState, SetDef};
use kairos_core::{EntityId, EventOrder, ImpactMeta, KindId, SetId, Time};
use kairos_engine::{Behavior, Entity, EntityAccess, Impact, WorldAccess};
use parking_lot::Mutex;

/// Set id of the counter row.
pub const COUNTER: SetId = SetId(16);
/// Row index of [`COUNTER`] in entities built here.
pub const COUNTER_INDEX: usize = 2;
/// Kind tag of [`counter_entity`].
pub const COUNTER_KIND: KindId = KindId(1);
/// Kind tag of [`plain_entity`].
pub const PLAIN_KIND: KindId = KindId(2);

/// Request id answered with the committed counter as little-endian bytes.
pub const REQUEST_COUNT: u32 = 1;
/// Modify id that adds a little-endian `i64` payload to the counter.
pub const MODIFY_ADD: u32 = 1;

// ── Counter ────────────────────────────────────────────────────────

/// Adds 1 to [`COUNTER`] whenever its clock fires.
#[derive(Clone, Copy, Debug, Default)]
pub struct Counter;

impl Behavior for Counter {
    fn tick(&self, entity: &EntityAccess<'_>, _world: &WorldAccess<'_>) {
        entity.apply_delta(COUNTER_INDEX, 1);
    }

    fn request(&self, state: &EntityState, id: u32, _args: &[u8]) -> Vec<u8> {
        match (id, state.get(COUNTER_INDEX)) {
            (REQUEST_COUNT, Ok(v)) => v.to_le_bytes().to_vec(),
            _ => Vec::new(),
        }
    }

    fn modify(&self, state: &mut EntityState, id: u32, args: &[u8]) {
        if id != MODIFY_ADD {
            return;
        }
        let Ok(bytes) = <[u8; 8]>::try_from(args) else {
            tracing::warn!(len = args.len(), "counter modify: expected 8 bytes");
            return;
        };
        if let Err(err) = state.apply_delta(COUNTER_INDEX, i64::from_le_bytes(bytes)) {
            tracing::error!(%err, "counter modify failed");
        }
    }
}

/// A dynamic counter ticking every `period` ticks, starting at 0.
pub fn counter_entity(period: i64) -> Entity {
    let state = EntityState::new([SetDef::new(COUNTER, 0)])
        .with_dynamic(true)
        .with_tick_period(period);
    Entity::new(COUNTER_KIND, state, Arc::new(Counter))
}

/// A passive entity whose counter starts at `value`.
pub fn plain_entity(value: i64) -> Entity {
    Entity::new(
        PLAIN_KIND,
        EntityState::new([SetDef::new(COUNTER, value)]),
        Arc::new(kairos_engine::Inert),
    )
}

// ── AddDelta ───────────────────────────────────────────────────────

/// Adds `delta` to row `index` of `target`.
#[derive(Clone, Debug)]
pub struct AddDelta {
    meta: ImpactMeta,
    pub target: EntityId,
    pub index: usize,
    pub delta: i64,
}

impl AddDelta {
    /// An async impact on the counter row.
    pub fn new(target: EntityId, delta: i64) -> Self {
        Self {
            meta: ImpactMeta::default(),
            target,
            index: COUNTER_INDEX,
            delta,
        }
    }

    /// Make it synchronous at `order`.
    pub fn ordered(mut self, order: EventOrder) -> Self {
        self.meta = self.meta.with_order(order);
        self.meta.is_async = false;
        self
    }

    /// Stamp a timeline time.
    pub fn at(mut self, time: Time) -> Self {
        self.meta = self.meta.with_time(time);
        self
    }
}

impl Impact for AddDelta {
    fn meta(&self) -> &ImpactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ImpactMeta {
        &mut self.meta
    }

    fn perform(&self, world: &WorldAccess<'_>) {
        match world.entity(self.target) {
            Some(entity) => entity.apply_delta(self.index, self.delta),
            None => tracing::warn!(target = %self.target, "add_delta: no entity"),
        }
    }
}

// ── SetValue ───────────────────────────────────────────────────────

/// Proposes `value` for the counter row of `target`.
#[derive(Clone, Debug)]
pub struct SetValue {
    meta: ImpactMeta,
    pub target: EntityId,
    pub value: i64,
}

impl SetValue {
    pub fn new(target: EntityId, value: i64, order: EventOrder) -> Self {
        Self {
            meta: ImpactMeta::sync().with_order(order),
            target,
            value,
        }
    }

    pub fn at(mut self, time: Time) -> Self {
        self.meta = self.meta.with_time(time);
        self
    }
}

impl Impact for SetValue {
    fn meta(&self) -> &ImpactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ImpactMeta {
        &mut self.meta
    }

    fn perform(&self, world: &WorldAccess<'_>) {
        if let Some(entity) = world.entity(self.target) {
            entity.set(COUNTER_INDEX, self.value);
        }
    }
}

// ── SpawnCounter ───────────────────────────────────────────────────

/// Spawns a [`counter_entity`] at `id` (or the next free id).
#[derive(Clone, Debug)]
pub struct SpawnCounter {
    meta: ImpactMeta,
    pub id: Option<EntityId>,
    pub period: i64,
}

impl SpawnCounter {
    pub fn new(id: Option<EntityId>, period: i64) -> Self {
        Self {
            meta: ImpactMeta::sync().with_order(EventOrder::root(0)),
            id,
            period,
        }
    }

    pub fn at(mut self, time: Time) -> Self {
        self.meta = self.meta.with_time(time);
        self
    }
}

impl Impact for SpawnCounter {
    fn meta(&self) -> &ImpactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ImpactMeta {
        &mut self.meta
    }

    fn perform(&self, world: &WorldAccess<'_>) {
        world.spawn(counter_entity(self.period), self.id);
    }
}

// ── RandomDelta ────────────────────────────────────────────────────

/// Adds a draw from `0..bound` to the counter row of `target`.
#[derive(Clone, Debug)]
pub struct RandomDelta {
    meta: ImpactMeta,
    pub target: EntityId,
    pub bound: i64,
}

impl RandomDelta {
    pub fn new(target: EntityId, bound: i64, order: EventOrder) -> Self {
        Self {
            meta: ImpactMeta::sync().with_order(order),
            target,
            bound,
        }
    }

    pub fn at(mut self, time: Time) -> Self {
        self.meta = self.meta.with_time(time);
        self
    }
}

impl Impact for RandomDelta {
    fn meta(&self) -> &ImpactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ImpactMeta {
        &mut self.meta
    }

    fn perform(&self, world: &WorldAccess<'_>) {
        let Some(draw) = world.random_range(0..self.bound) else {
            return;
        };
        if let Some(entity) = world.entity(self.target) {
            entity.apply_delta(COUNTER_INDEX, draw);
        }
    }
}

// ── Fanout ─────────────────────────────────────────────────────────

/// Queues `children` ordered [`Record`] impacts tagged `base + i`.
pub struct Fanout {
    meta: ImpactMeta,
    pub children: u32,
    pub base: u32,
    pub log: Arc<Mutex<Vec<u32>>>,
}

impl Fanout {
    pub fn new(order: EventOrder, children: u32, base: u32, log: &Arc<Mutex<Vec<u32>>>) -> Self {
        Self {
            meta: ImpactMeta::sync().with_order(order),
            children,
            base,
            log: Arc::clone(log),
        }
    }
}

impl Impact for Fanout {
    fn meta(&self) -> &ImpactMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ImpactMeta {
        &mut self.meta
    }

    fn perform(&self, world: &WorldAccess<'_>) {
        let mut counter = 0;
        for i in 0..self.children {
            let order = self.meta.order.spawn(&mut counter);
            world.queue(Record::new(order, self.base + i, &self.log));
        }
    }
}

// ── Record ─────────────────────────────────────────────────────────

/// Appends `tag` to a shared log.
pub struct Record {
    meta: ImpactMeta,
    pub tag: u32,
    pub log: Arc<Mutex<Vec<u32>>>,
}

impl Record {
    /// A sync record at `order`.
    pub fn new(order: EventOrder, tag: u32, log: &Arc<Mutex<Vec<u32>>>) -> Self {
        Self {
            meta: ImpactMeta::sync().with_order(order),
            tag,
            log: Arc::clone(log),
        }
    }
}

impl Impact for Record {
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

/// A fresh shared log for [`Record`] and [`Fanout`].
pub fn new_log() -> Arc<Mutex<Vec<u32>>> {
    Arc::new(Mutex::new(Vec::new()))
}
