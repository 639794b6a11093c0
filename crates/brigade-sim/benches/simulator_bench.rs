//! Benchmarks for the bucket brigade simulator
//!
//! Measures performance of:
//! - Full runs at increasing worker counts
//! - Runs with pebble windows
//! - Trajectory recording overhead

use brigade_sim::{simulate, Horizon, RunConfig, SimulationOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Evenly spaced velocities on a unit line
fn line_of(workers: u32, cycles: u64) -> RunConfig {
    (1..=workers).fold(RunConfig::new(1.0, Horizon::Cycles(cycles)), |config, rank| {
        config.with_worker(rank, rank as f64 * 0.1)
    })
}

/// Benchmark full runs at different worker counts
fn bench_worker_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_count");

    for &workers in &[1u32, 2, 4, 8, 16, 32] {
        let config = line_of(workers, 100);
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::from_parameter(workers), &config, |b, config| {
            b.iter(|| simulate(black_box(config)))
        });
    }
    group.finish();
}

/// Benchmark runs with a growing number of pebble windows
fn bench_pebbles(c: &mut Criterion) {
    let mut group = c.benchmark_group("pebbles");

    for &pebbles in &[0u32, 10, 100] {
        let config = (0..pebbles).fold(line_of(4, 200), |config, i| {
            config.with_pebble(i % 4 + 1, i as f64 * 5.0, 2.0, 0.5)
        });
        group.bench_with_input(BenchmarkId::from_parameter(pebbles), &config, |b, config| {
            b.iter(|| simulate(black_box(config)))
        });
    }
    group.finish();
}

/// Compare runs with and without trajectory recording
fn bench_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("recording");

    for record_trajectories in [false, true] {
        let config = line_of(8, 200).with_options(SimulationOptions {
            record_trajectories,
            ..SimulationOptions::default()
        });
        group.bench_with_input(
            BenchmarkId::from_parameter(record_trajectories),
            &config,
            |b, config| b.iter(|| simulate(black_box(config))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_worker_count, bench_pebbles, bench_recording);
criterion_main!(benches);
