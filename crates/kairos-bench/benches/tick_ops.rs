//! Criterion benchmarks for full ticks at several worker pool sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kairos_bench::{counter_world, queue_deltas};

fn bench_dynamic_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_1k_counters");
    for threads in [0, 2, 4, 8] {
        let world = counter_world(threads, 1_000, 1);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| world.tick(1));
        });
    }
    group.finish();
}

fn bench_async_flood(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_10k_async_impacts");
    for threads in [0, 4] {
        let world = counter_world(threads, 100, 1_000);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| {
                queue_deltas(&world, 100, 100);
                world.tick(1);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dynamic_ticks, bench_async_flood);
criterion_main!(benches);
