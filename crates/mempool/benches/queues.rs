//! Free-index queue benchmarks
//!
//! Measures:
//! - Uncontended push/pop pairs per algorithm
//! - Multi-threaded churn through the stress harness
//! - Comparison between the lock-free queues and the channel baseline

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nebula_mempool::harness::{StressConfig, run_queue_stress};
use nebula_mempool::{
    AnyQueue, ChannelQueue, IncrementQueue, IndexQueue, PackedQueue, QueueKind, TicketQueue,
};
use std::hint::black_box;

const CAPACITY: usize = 1 << 12;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue/push_pop");
    group.throughput(Throughput::Elements(2));

    for kind in QueueKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            let queue = AnyQueue::new(kind, CAPACITY).unwrap();
            for index in 0..CAPACITY / 2 {
                queue.try_push(index);
            }

            b.iter(|| {
                let index = queue.try_pop().unwrap();
                black_box(queue.try_push(black_box(index)));
            });
        });
    }

    group.finish();
}

fn bench_drain_refill(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue/drain_refill");
    group.throughput(Throughput::Elements(2 * CAPACITY as u64));

    fn drain_refill<Q: IndexQueue>(queue: &Q) {
        for index in 0..CAPACITY {
            black_box(queue.try_pop());
            queue.try_push(index);
        }
    }

    group.bench_function("ticket", |b| {
        let queue = TicketQueue::with_capacity(CAPACITY).unwrap();
        b.iter(|| drain_refill(&queue));
    });
    group.bench_function("packed", |b| {
        let queue = PackedQueue::with_capacity(CAPACITY).unwrap();
        b.iter(|| drain_refill(&queue));
    });
    group.bench_function("increment", |b| {
        let queue = IncrementQueue::with_capacity(CAPACITY).unwrap();
        b.iter(|| drain_refill(&queue));
    });
    group.bench_function("channel", |b| {
        let queue = ChannelQueue::with_capacity(CAPACITY).unwrap();
        b.iter(|| drain_refill(&queue));
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue/contended");
    group.sample_size(10);

    for parallelism in [1, 2, 4, 8] {
        let config = StressConfig {
            parallelism,
            batch: 1 << 8,
            capacity: CAPACITY,
            iterations: 1 << 14,
            shards: 1,
        };
        group.throughput(Throughput::Elements(
            (config.parallelism * config.iterations) as u64,
        ));

        group.bench_with_input(
            BenchmarkId::new("ticket", parallelism),
            &config,
            |b, config| b.iter(|| run_queue_stress::<TicketQueue>(config).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("packed", parallelism),
            &config,
            |b, config| b.iter(|| run_queue_stress::<PackedQueue>(config).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("channel", parallelism),
            &config,
            |b, config| b.iter(|| run_queue_stress::<ChannelQueue>(config).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_drain_refill, bench_contended);
criterion_main!(benches);
