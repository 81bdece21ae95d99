// src/pool/queue.rs
//! Backpressure wait queue.
//!
//! A FIFO of pending acquire callbacks, drained one entry per release.
//! The queue has an explicit logical capacity independent of its backing
//! storage: pushes fail once `len == capacity`, at which point the
//! capacity doubles on demand (or grows by an explicit amount via
//! [`crate::ObjectPool::grow_queue`]). Capacity never shrinks.
//!
//! Lock order: the queue mutex nests **inside** shard mutexes — release
//! pops while holding a shard lock — and is never held while taking a
//! shard lock.

use crate::alloc::PoolAllocator;
use crate::error::{PoolError, Result};
use crate::pool::handle::PooledObject;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A queued acquire request: the callback owns its context via capture.
pub(crate) type AcquireCallback<T, A> = Box<dyn FnOnce(PooledObject<T, A>) + Send + 'static>;

struct QueueState<T, A: PoolAllocator<T>> {
    requests: VecDeque<AcquireCallback<T, A>>,
    capacity: usize,
    max_size: usize,
    grow_count: usize,
}

pub(crate) struct WaitQueue<T, A: PoolAllocator<T>> {
    state: Mutex<QueueState<T, A>>,
    /// Mirror of `requests.len()`, so release can skip the queue lock when
    /// nothing is waiting.
    len: AtomicUsize,
}

impl<T, A: PoolAllocator<T>> WaitQueue<T, A> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                requests: VecDeque::with_capacity(capacity),
                capacity,
                max_size: 0,
                grow_count: 0,
            }),
            len: AtomicUsize::new(0),
        }
    }

    /// Appends a request, doubling the capacity if the queue is full.
    pub(crate) fn enqueue(&self, callback: AcquireCallback<T, A>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.requests.len() == state.capacity {
            let doubled = state.capacity.max(1) * 2;
            if Self::reserve(&mut state, doubled).is_err() {
                return Err(PoolError::QueueFull);
            }
        }
        state.requests.push_back(callback);
        let size = state.requests.len();
        if size > state.max_size {
            state.max_size = size;
        }
        self.len.store(size, Ordering::Relaxed);
        Ok(())
    }

    /// Pops the oldest request, if any.
    pub(crate) fn pop(&self) -> Option<AcquireCallback<T, A>> {
        let mut state = self.state.lock().unwrap();
        let popped = state.requests.pop_front();
        self.len.store(state.requests.len(), Ordering::Relaxed);
        popped
    }

    /// Grows the logical capacity by `additional` slots.
    pub(crate) fn grow(&self, additional: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let target = state.capacity + additional;
        Self::reserve(&mut state, target)
    }

    fn reserve(state: &mut QueueState<T, A>, new_capacity: usize) -> Result<()> {
        let additional = new_capacity - state.requests.len();
        state
            .requests
            .try_reserve_exact(additional)
            .map_err(|_| PoolError::AllocationFailed)?;
        state.capacity = new_capacity;
        state.grow_count += 1;
        Ok(())
    }

    /// Current queue depth (may be briefly stale).
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// (high-water mark, growth count) for stats aggregation.
    pub(crate) fn counters(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.max_size, state.grow_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::DefaultAllocator;

    type TestQueue = WaitQueue<u32, DefaultAllocator>;

    #[test]
    fn test_fifo_order() {
        let queue: TestQueue = WaitQueue::new(4);
        for id in 0..3u32 {
            queue
                .enqueue(Box::new(move |mut obj| *obj = id))
                .unwrap();
        }
        assert_eq!(queue.len(), 3);

        // Drain and check arrival order survives via the captured ids.
        let mut seen = Vec::new();
        while queue.pop().is_some() {
            seen.push(queue.len());
        }
        assert_eq!(seen, vec![2, 1, 0]);
    }

    #[test]
    fn test_doubles_when_full() {
        let queue: TestQueue = WaitQueue::new(2);
        for _ in 0..5 {
            queue.enqueue(Box::new(|_| {})).unwrap();
        }
        let (max_size, grow_count) = queue.counters();
        assert_eq!(max_size, 5);
        assert!(grow_count >= 2); // 2 -> 4 -> 8
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_explicit_grow() {
        let queue: TestQueue = WaitQueue::new(1);
        queue.grow(7).unwrap();
        for _ in 0..8 {
            queue.enqueue(Box::new(|_| {})).unwrap();
        }
        let (max_size, _) = queue.counters();
        assert_eq!(max_size, 8);
    }

    #[test]
    fn test_high_water_mark_survives_drain() {
        let queue: TestQueue = WaitQueue::new(4);
        for _ in 0..3 {
            queue.enqueue(Box::new(|_| {})).unwrap();
        }
        while queue.pop().is_some() {}
        let (max_size, _) = queue.counters();
        assert_eq!(max_size, 3);
        assert_eq!(queue.len(), 0);
    }
}
