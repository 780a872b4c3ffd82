//! Criterion benchmarks for whole routing days, serial and threaded, and
//! checkpoint writes.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use hydroute_bench::{basin_profile, stress_profile};
use hydroute_checkpoint::{state_hash, write_checkpoint};
use hydroute_engine::{run_parallel, RoutingConfig, SerialRouter};

/// Benchmark: one routing day on 10K cells, serial.
fn bench_serial_day_10k(c: &mut Criterion) {
    let p = basin_profile(42).unwrap();
    let mut router =
        SerialRouter::new(&p.network, &p.irrigation, &p.cells, &RoutingConfig::default()).unwrap();
    let days = p.forcing.days();
    let mut day = 0;
    c.bench_function("serial_day_10k", |b| {
        b.iter(|| {
            let report = router.step(&p.forcing, day).unwrap();
            day = (day + 1) % days;
            black_box(report.sink_outflow);
        });
    });
}

/// Benchmark: one routing day on 100K cells, serial.
fn bench_serial_day_100k(c: &mut Criterion) {
    let p = stress_profile(42).unwrap();
    let mut router =
        SerialRouter::new(&p.network, &p.irrigation, &p.cells, &RoutingConfig::default()).unwrap();
    let days = p.forcing.days();
    let mut day = 0;
    let mut group = c.benchmark_group("stress");
    group.sample_size(10);
    group.bench_function("serial_day_100k", |b| {
        b.iter(|| {
            let report = router.step(&p.forcing, day).unwrap();
            day = (day + 1) % days;
            black_box(report.sink_outflow);
        });
    });
    group.finish();
}

/// Benchmark: 30 days on 10K cells across 4 worker threads, including
/// domain setup.
fn bench_parallel_month_10k(c: &mut Criterion) {
    let p = basin_profile(42).unwrap();
    let config = RoutingConfig::default();
    let mut group = c.benchmark_group("parallel");
    group.sample_size(10);
    group.bench_function("parallel_month_10k_4w", |b| {
        b.iter(|| {
            let run =
                run_parallel(&p.network, &p.irrigation, &p.cells, &config, 4, &p.forcing).unwrap();
            black_box(run.discharge.len());
        });
    });
    group.finish();
}

/// Benchmark: checkpoint write and state hash of a warmed-up 10K domain.
fn bench_checkpoint_10k(c: &mut Criterion) {
    let p = basin_profile(42).unwrap();
    let mut router =
        SerialRouter::new(&p.network, &p.irrigation, &p.cells, &RoutingConfig::default()).unwrap();
    router.run(&p.forcing, 0..p.forcing.days()).unwrap();
    let mut buf = Vec::new();
    c.bench_function("checkpoint_write_10k", |b| {
        b.iter(|| {
            buf.clear();
            write_checkpoint(&mut buf, router.domain()).unwrap();
            black_box(buf.len());
        });
    });
    c.bench_function("state_hash_10k", |b| {
        b.iter(|| black_box(state_hash(router.domain())));
    });
}

criterion_group!(
    benches,
    bench_serial_day_10k,
    bench_serial_day_100k,
    bench_parallel_month_10k,
    bench_checkpoint_10k
);
criterion_main!(benches);
