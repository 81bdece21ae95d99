// src/lib.rs
//! # Reusable Object Pool
//!
//! A sharded, thread-safe pool of pre-allocated, fixed-shape objects for
//! workloads that repeatedly acquire and release short-lived objects
//! (messages, buffers, request contexts).
//!
//! Features:
//! - Pluggable allocators: construct/reset/validate plus lifecycle hooks
//! - Sharded slot table with per-shard mutexes and randomized shard
//!   selection for low contention
//! - O(1) release via a 16-byte metadata header stamped into every object
//! - Backpressure: exhausted acquires can park a callback that fires on
//!   the next release, in FIFO order
//! - Dynamic resizing: grow the pool, shrink free tail slots, grow the
//!   request queue
//! - Detailed statistics: high-water marks, acquire/release counts,
//!   contention samples
//!
//! # Quick start
//!
//! ```rust
//! use repool::BytePool;
//!
//! // 16 objects of 512 zeroed bytes, spread over 4 shards.
//! let pool = BytePool::with_defaults(512)?;
//!
//! let mut obj = pool.acquire().expect("fresh pool has free objects");
//! obj.as_mut_slice()[..5].copy_from_slice(b"hello");
//! drop(obj); // released and re-zeroed
//!
//! assert_eq!(pool.used_count(), 0);
//! # Ok::<(), repool::PoolError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alloc;
pub mod error;
pub mod pool;

// Re-export main types
pub use alloc::{ByteAllocator, ByteBlock, DefaultAllocator, PoolAllocator};
pub use error::{ErrorSink, PoolError, Result, ResultExt};
pub use pool::{
    AcquireOutcome, BytePool, ObjectPool, PoolConfig, PoolStats, PooledObject, SlotAddr,
};

/// Commonly used imports.
pub mod prelude {
    pub use crate::alloc::{ByteAllocator, ByteBlock, DefaultAllocator, PoolAllocator};
    pub use crate::error::{ErrorSink, PoolError, Result, ResultExt};
    pub use crate::pool::{
        AcquireOutcome, BytePool, ObjectPool, PoolConfig, PoolStats, PooledObject, SlotAddr,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_basic_pool() {
        let pool = BytePool::with_defaults(64).unwrap();
        assert_eq!(pool.capacity(), 16);

        let mut obj = pool.acquire().unwrap();
        obj.as_mut_slice()[0] = 0xFF;
        drop(obj);

        let stats = pool.stats();
        assert_eq!(stats.acquire_count, 1);
        assert_eq!(stats.release_count, 1);
    }

    #[test]
    fn test_custom_allocator_pool() {
        #[derive(Default)]
        struct Request {
            id: u64,
            body: Vec<u8>,
        }

        let pool = ObjectPool::<Request, _>::with_default_allocator(PoolConfig {
            capacity: 8,
            shard_count: 2,
            queue_capacity: 8,
        })
        .unwrap();

        let mut req = pool.acquire().unwrap();
        req.id = 7;
        req.body.extend_from_slice(b"payload");
        drop(req);

        // Reset on release and again on acquire: the next object is fresh.
        let req = pool.acquire().unwrap();
        assert_eq!(req.id, 0);
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_exhaustion_reports_none() {
        let pool = ObjectPool::<u32, _>::with_default_allocator(PoolConfig {
            capacity: 2,
            shard_count: 1,
            queue_capacity: 4,
        })
        .unwrap();

        let held: Vec<_> = (0..2).map(|_| pool.acquire().unwrap()).collect();
        assert!(pool.acquire().is_none());
        drop(held);
        assert_eq!(pool.used_count(), 0);
    }

    #[test]
    fn test_pool_concurrency() {
        use std::sync::Arc;
        use std::thread;

        let pool = Arc::new(BytePool::with_defaults(256).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..100u32 {
                        loop {
                            if let Some(mut obj) = pool.acquire() {
                                obj.as_mut_slice()[..4].copy_from_slice(&i.to_be_bytes());
                                break;
                            }
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.acquire_count, 400);
        assert_eq!(stats.release_count, 400);
        assert_eq!(pool.used_count(), 0);
    }
}
