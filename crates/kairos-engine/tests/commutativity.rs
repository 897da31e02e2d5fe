//! Integration test: concurrent deltas commute and adjust is idempotent.

use std::thread;

use kairos_engine::{AccessMode, World, WorldConfig};
use kairos_test_utils::{
    counter_entity, plain_entity, AddDelta, COUNTER_INDEX, MODIFY_ADD, REQUEST_COUNT,
};
use proptest::prelude::*;

#[test]
fn threads_applying_deltas_sum_exactly() {
    let world = World::default();
    let id = world.spawn(plain_entity(0), None).unwrap();

    thread::scope(|s| {
        for _ in 0..10 {
            s.spawn(|| {
                let entity = world.entity(id).unwrap();
                for _ in 0..10 {
                    entity.apply_delta(COUNTER_INDEX, 1);
                }
            });
        }
    });
    let entity = world.entity(id).unwrap();
    assert_eq!(entity.get(COUNTER_INDEX), 0);
    entity.adjust();
    assert_eq!(entity.get(COUNTER_INDEX), 100);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let entity = world.entity(id).unwrap();
                for _ in 0..100 {
                    entity.apply_delta(COUNTER_INDEX, 1);
                }
            });
        }
    });
    entity.adjust();
    assert_eq!(entity.get(COUNTER_INDEX), 500);
    assert!(!world.is_desync());
}

#[test]
fn adjust_twice_is_a_no_op() {
    let world = World::default();
    let id = world.spawn(plain_entity(3), None).unwrap();
    let entity = world.entity(id).unwrap();
    entity.apply_delta(COUNTER_INDEX, 4);
    entity.vec_add(&[1, 2, 3]);
    entity.bytes_resize(2);
    entity.bytes_apply_delta(1, -3);
    entity.adjust();
    let once = entity.entity().unwrap().snapshot().unwrap();
    entity.adjust();
    let twice = entity.entity().unwrap().snapshot().unwrap();
    assert_eq!(once, twice);
    assert_eq!(entity.get(COUNTER_INDEX), 7);
    assert_eq!(entity.vec_get_all(), vec![1, 2, 3]);
    assert_eq!(entity.bytes_get_all(), vec![0, -3]);
    assert!(!entity.is_changed());
}

#[test]
fn paired_increments_and_decrements_cancel_across_workers() {
    let world = World::new(WorldConfig::default().with_threads(4)).unwrap();
    let id = world.spawn(plain_entity(0), None).unwrap();
    for _ in 0..100 {
        world.queue(AddDelta::new(id, 1));
        world.queue(AddDelta::new(id, -1));
    }
    for _ in 0..100 {
        world.queue(AddDelta::new(id, 1));
    }
    world.tick(1);
    assert_eq!(world.entity(id).unwrap().get(COUNTER_INDEX), 100);
    assert_eq!(world.metrics().async_impacts, 300);
}

#[test]
fn read_only_access_still_reads() {
    let world = World::default();
    let id = world.spawn(plain_entity(9), None).unwrap();
    let access = world.access(AccessMode::ReadOnly);
    assert_eq!(access.entity(id).unwrap().get(COUNTER_INDEX), 9);
    assert!(access.spawn(plain_entity(1), None).is_none());
    assert_eq!(world.entity_count(), 1);
}

#[test]
fn read_only_access_cannot_write_entities() {
    let world = World::default();
    let id = world.spawn(plain_entity(1), None).unwrap();
    let entity = world.access(AccessMode::ReadOnly).entity(id).unwrap();
    entity.set(COUNTER_INDEX, 42);
    entity.apply_delta(COUNTER_INDEX, 3);
    entity.modify(MODIFY_ADD, &7i64.to_le_bytes());
    entity.adjust();
    assert_eq!(entity.get(COUNTER_INDEX), 1);

    world.tick(1);
    assert_eq!(world.entity(id).unwrap().get(COUNTER_INDEX), 1);
    assert!(!world.is_desync());
}

#[test]
fn modify_adds_as_a_delta_and_request_reads_committed() {
    let world = World::default();
    let id = world.spawn(counter_entity(1_000), None).unwrap();
    let entity = world.entity(id).unwrap();
    entity.modify(MODIFY_ADD, &5i64.to_le_bytes());
    entity.modify(MODIFY_ADD, &[1, 2, 3]);
    assert_eq!(entity.request(REQUEST_COUNT, &[]), 0i64.to_le_bytes().to_vec());
    entity.adjust();
    assert_eq!(entity.request(REQUEST_COUNT, &[]), 5i64.to_le_bytes().to_vec());
    assert!(entity.request(99, &[]).is_empty());

    let read_only = world.access(AccessMode::ReadOnly).entity(id).unwrap();
    read_only.modify(MODIFY_ADD, &5i64.to_le_bytes());
    assert!(!read_only.is_changed());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn any_split_of_deltas_sums_to_total(
        chunks in prop::collection::vec(prop::collection::vec(-1000i64..1000, 0..40), 1..6)
    ) {
        let world = World::default();
        let id = world.spawn(plain_entity(0), None).unwrap();
        thread::scope(|s| {
            for chunk in &chunks {
                let world = &world;
                s.spawn(move || {
                    let entity = world.entity(id).unwrap();
                    for &d in chunk {
                        entity.apply_delta(COUNTER_INDEX, d);
                    }
                });
            }
        });
        let entity = world.entity(id).unwrap();
        entity.adjust();
        let total: i64 = chunks.iter().flatten().sum();
        prop_assert_eq!(entity.get(COUNTER_INDEX), total);
    }
}
