// benches/pool_bench.rs
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use repool::prelude::*;
use std::hint::black_box;

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");

    for shards in [1usize, 2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("shards", shards),
            shards,
            |b, &shards| {
                let pool = ObjectPool::<u64, _>::with_default_allocator(PoolConfig {
                    capacity: 64,
                    shard_count: shards,
                    queue_capacity: 32,
                })
                .unwrap();

                b.iter(|| {
                    let mut obj = pool.acquire().unwrap();
                    *obj = black_box(42);
                });
            },
        );
    }

    group.finish();
}

fn bench_pool_vs_direct(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_comparison");

    // With pool
    group.bench_function("with_pool", |b| {
        let pool = ObjectPool::new(
            PoolConfig {
                capacity: 32,
                shard_count: 4,
                queue_capacity: 32,
            },
            ByteAllocator::new(1024),
        )
        .unwrap();

        b.iter(|| {
            let mut obj = pool.acquire().unwrap();
            obj.as_mut_slice()[..512].copy_from_slice(black_box(&[7u8; 512]));
        });
    });

    // Direct allocation
    group.bench_function("direct_alloc", |b| {
        b.iter(|| {
            let mut buf = vec![0u8; 1024].into_boxed_slice();
            buf[..512].copy_from_slice(black_box(&[7u8; 512]));
            black_box(&buf);
        });
    });

    group.finish();
}

fn bench_backpressure_enqueue(c: &mut Criterion) {
    c.bench_function("enqueue_and_drain", |b| {
        let pool = ObjectPool::<u64, _>::with_default_allocator(PoolConfig {
            capacity: 1,
            shard_count: 1,
            queue_capacity: 32,
        })
        .unwrap();

        b.iter(|| {
            let held = pool.acquire().unwrap();
            let outcome = pool.acquire_or_queue(|obj| drop(obj)).unwrap();
            assert!(outcome.is_enqueued());
            drop(held); // fires the queued callback inline
        });
    });
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_pool_vs_direct,
    bench_backpressure_enqueue
);
criterion_main!(benches);
