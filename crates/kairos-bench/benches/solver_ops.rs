//! Criterion benchmarks for solver replay.

use criterion::{criterion_group, criterion_main, Criterion};
use kairos_core::{EntityId, EventOrder};
use kairos_engine::World;
use kairos_solver::{Solver, SolverConfig};
use kairos_test_utils::{AddDelta, SpawnCounter};

fn bench_full_replay(c: &mut Criterion) {
    let config = SolverConfig::default().with_rewind(true);
    let mut solver = Solver::with_world(config, World::single_threaded());
    for id in 0..32 {
        solver
            .apply(SpawnCounter::new(Some(EntityId(id)), 2).at(0))
            .ok();
    }
    for t in 1..200u64 {
        solver
            .apply(
                AddDelta::new(EntityId((t % 32) as u32), 1)
                    .ordered(EventOrder::root(t))
                    .at(t),
            )
            .ok();
    }
    solver.solve(200);

    c.bench_function("rewind_to_zero_and_replay_200_ticks", |b| {
        b.iter(|| {
            solver.rewind_to(0);
            solver.rewind_to(200);
        });
    });
}

criterion_group!(benches, bench_full_replay);
criterion_main!(benches);
