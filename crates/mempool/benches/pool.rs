//! Object pool benchmarks
//!
//! Compares pooled acquire/release against a fresh `Box::new` per object,
//! and measures sharded pools under contention.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nebula_mempool::harness::{StressConfig, run_pool_stress};
use nebula_mempool::{PackedQueue, Pool, PoolConfig, TicketQueue};
use std::hint::black_box;

type Frame = [u64; 32];

fn bench_single_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/single_object");

    group.bench_function("ticket_pool", |b| {
        let pool: Pool<Frame> =
            Pool::with_config(PoolConfig::production(1024), |_| [0; 32]).unwrap();
        b.iter(|| {
            let mut frame = pool.try_acquire().unwrap();
            frame[0] = black_box(1);
            drop(black_box(frame));
        });
    });

    group.bench_function("packed_pool", |b| {
        let pool: Pool<Frame, PackedQueue> =
            Pool::with_config(PoolConfig::production(1024), |_| [0; 32]).unwrap();
        b.iter(|| {
            let mut frame = pool.try_acquire().unwrap();
            frame[0] = black_box(1);
            drop(black_box(frame));
        });
    });

    // System allocator (baseline)
    group.bench_function("box_new", |b| {
        b.iter(|| {
            let mut frame = Box::new([0_u64; 32]);
            frame[0] = black_box(1);
            drop(black_box(frame));
        });
    });

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/batch");

    for &batch in &[16_usize, 256] {
        group.throughput(Throughput::Elements(batch as u64));

        group.bench_with_input(BenchmarkId::new("ticket_pool", batch), &batch, |b, &batch| {
            let pool: Pool<Frame> =
                Pool::with_config(PoolConfig::production(batch), |_| [0; 32]).unwrap();
            let mut held = Vec::with_capacity(batch);
            b.iter(|| {
                held.extend((0..batch).map(|_| pool.try_acquire().unwrap()));
                held.clear();
            });
        });

        group.bench_with_input(BenchmarkId::new("box_new", batch), &batch, |b, &batch| {
            let mut held = Vec::with_capacity(batch);
            b.iter(|| {
                held.extend((0..batch).map(|_| Box::new([0_u64; 32])));
                held.clear();
            });
        });
    }

    group.finish();
}

fn bench_sharded(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/sharded");
    group.sample_size(10);

    for shards in [1, 2, 4] {
        let config = StressConfig {
            parallelism: 4,
            batch: 1 << 8,
            capacity: 1 << 12,
            iterations: 1 << 14,
            shards,
        };
        group.throughput(Throughput::Elements(
            (config.parallelism * config.iterations) as u64,
        ));

        group.bench_with_input(BenchmarkId::new("ticket", shards), &config, |b, config| {
            b.iter(|| run_pool_stress::<TicketQueue>(config).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("packed", shards), &config, |b, config| {
            b.iter(|| run_pool_stress::<PackedQueue>(config).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_object, bench_batch, bench_sharded);
criterion_main!(benches);
