// demos/backpressure.rs
//! Backpressure under contention: more workers than pooled objects.
//!
//! Five workers compete for two objects. Workers that find the pool
//! exhausted park a callback; each release hands the freed object to the
//! oldest waiter.

use repool::prelude::*;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    let pool = Arc::new(ObjectPool::<u64, _>::with_default_allocator(PoolConfig {
        capacity: 2,
        shard_count: 1,
        queue_capacity: 8,
    })?);

    let (tx, rx) = mpsc::channel::<String>();
    let mut workers = Vec::new();

    for id in 0..5u64 {
        let pool = Arc::clone(&pool);
        let tx = tx.clone();
        workers.push(thread::spawn(move || {
            let done_tx = tx.clone();
            let outcome = pool
                .acquire_or_queue(move |mut obj| {
                    *obj = id;
                    done_tx
                        .send(format!("worker {id}: served via callback"))
                        .unwrap();
                    // Dropping the object here releases it to the next waiter.
                })
                .expect("queue accepts the request");

            match outcome {
                AcquireOutcome::Ready(mut obj) => {
                    *obj = id;
                    thread::sleep(Duration::from_millis(50));
                    tx.send(format!("worker {id}: served inline")).unwrap();
                }
                AcquireOutcome::Enqueued => {
                    println!("worker {id}: pool exhausted, waiting in queue");
                }
            }
        }));
    }
    drop(tx);

    for line in rx {
        println!("{line}");
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = pool.stats();
    println!(
        "\nall workers served: acquired={} released={} queue_max={}",
        stats.acquire_count, stats.release_count, stats.queue_max_size
    );
    assert_eq!(pool.used_count(), 0);

    Ok(())
}
