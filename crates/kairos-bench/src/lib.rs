//! Benchmark profiles for the Kairos simulation kernel.
//!
//! - [`counter_world`]: a world full of dynamic counters
//! - [`queue_deltas`]: floods a world with async impacts

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use kairos_core::EntityId;
use kairos_engine::{World, WorldConfig};
use kairos_test_utils::{counter_entity, AddDelta};

/// A world with `entities` dynamic counters of tick period `period`,
/// ticked by `threads` workers.
pub fn counter_world(threads: i64, entities: usize, period: i64) -> World {
    let world = World::new(WorldConfig::default().with_threads(threads))
        .unwrap_or_else(|_| World::single_threaded());
    for _ in 0..entities {
        world.spawn(counter_entity(period), None);
    }
    world
}

/// Queue `per_entity` async `+1` impacts for each of the first
/// `entities` ids.
pub fn queue_deltas(world: &World, entities: usize, per_entity: usize) {
    for id in 0..entities as u32 {
        for _ in 0..per_entity {
            world.queue(AddDelta::new(EntityId(id), 1));
        }
    }
}
