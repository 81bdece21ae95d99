// src/pool/shard.rs
//! One shard of the slot table.
//!
//! A shard is a mutex-protected, ordered, resizable array of slots plus
//! usage counters. Slot payloads live in stable heap blocks outside the
//! mutex, so a caller holding an acquired object can touch it without the
//! shard lock; the `used` flag (only ever flipped under the lock) is what
//! guarantees exclusivity.
//!
//! Contention accounting: every lock acquisition goes through
//! [`Shard::lock`], which takes a timestamp immediately before the mutex
//! attempt, counts the attempt, and adds the elapsed nanoseconds (wait
//! plus hold) when the guard unlocks. The counters are shard-level
//! atomics so the post-unlock write needs no lock of its own.

use crate::pool::block::SlotBlock;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// One slot: a stable heap block and its in-use flag.
pub(crate) struct Slot<T> {
    pub(crate) block: NonNull<SlotBlock<T>>,
    pub(crate) used: bool,
}

// SAFETY: a Slot exclusively owns its heap block; the pointer is never
// shared outside the pool except through a PooledObject, which takes over
// the payload while `used` is set. Moving the slot between threads moves
// plain ownership of the block, which is sound whenever T itself is Send.
unsafe impl<T: Send> Send for Slot<T> {}

/// Mutex-protected portion of a shard.
pub(crate) struct ShardState<T> {
    pub(crate) slots: Vec<Slot<T>>,
    pub(crate) used_count: usize,
    pub(crate) max_used: usize,
    pub(crate) acquire_count: usize,
    pub(crate) release_count: usize,
}

impl<T> ShardState<T> {
    pub(crate) fn with_capacity(size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(size),
            used_count: 0,
            max_used: 0,
            acquire_count: 0,
            release_count: 0,
        }
    }

    /// Number of contiguous free slots at the tail, the only region
    /// shrink may remove.
    pub(crate) fn tail_free(&self) -> usize {
        self.slots.iter().rev().take_while(|slot| !slot.used).count()
    }
}

pub(crate) struct Shard<T> {
    state: Mutex<ShardState<T>>,
    /// Mirror of `state.slots.len()`, kept in sync under the lock, so
    /// `capacity()` never has to take it.
    len: AtomicUsize,
    contention_attempts: AtomicUsize,
    contention_time_ns: AtomicU64,
}

impl<T> Shard<T> {
    pub(crate) fn new(state: ShardState<T>) -> Self {
        let len = state.slots.len();
        Self {
            state: Mutex::new(state),
            len: AtomicUsize::new(len),
            contention_attempts: AtomicUsize::new(0),
            contention_time_ns: AtomicU64::new(0),
        }
    }

    /// Locks the shard, recording a contention sample for the attempt.
    pub(crate) fn lock(&self) -> ShardGuard<'_, T> {
        self.contention_attempts.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        ShardGuard {
            state: self.state.lock().unwrap(),
            contention_time_ns: &self.contention_time_ns,
            started,
        }
    }

    /// Direct state access for teardown, when no other thread can hold
    /// the pool.
    pub(crate) fn state_mut(&mut self) -> &mut ShardState<T> {
        self.state.get_mut().unwrap()
    }

    /// Slot count without taking the lock.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Re-syncs the lock-free length mirror; call under the guard after
    /// growing or truncating the slot array.
    pub(crate) fn store_len(&self, len: usize) {
        self.len.store(len, Ordering::Relaxed);
    }

    pub(crate) fn contention_attempts(&self) -> usize {
        self.contention_attempts.load(Ordering::Relaxed)
    }

    pub(crate) fn contention_time_ns(&self) -> u64 {
        self.contention_time_ns.load(Ordering::Relaxed)
    }
}

/// Lock guard that closes the contention sample when dropped.
pub(crate) struct ShardGuard<'a, T> {
    state: MutexGuard<'a, ShardState<T>>,
    contention_time_ns: &'a AtomicU64,
    started: Instant,
}

impl<T> Deref for ShardGuard<'_, T> {
    type Target = ShardState<T>;
    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl<T> DerefMut for ShardGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl<T> Drop for ShardGuard<'_, T> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_nanos() as u64;
        self.contention_time_ns.fetch_add(elapsed, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::block::{SlotAddr, SlotBlock};

    fn slot(used: bool) -> Slot<u32> {
        let block = SlotBlock::new(SlotAddr::pack(0, 0), 0u32);
        Slot {
            block: NonNull::from(Box::leak(block)),
            used,
        }
    }

    fn free_slots(state: ShardState<u32>) {
        for s in state.slots {
            unsafe { drop(Box::from_raw(s.block.as_ptr())) };
        }
    }

    #[test]
    fn test_tail_free() {
        let mut state = ShardState::with_capacity(4);
        state.slots.push(slot(true));
        state.slots.push(slot(false));
        state.slots.push(slot(false));
        assert_eq!(state.tail_free(), 2);

        state.slots.push(slot(true));
        assert_eq!(state.tail_free(), 0);
        free_slots(state);
    }

    #[test]
    fn test_lock_records_contention() {
        let shard = Shard::new(ShardState::<u32>::with_capacity(0));
        {
            let _guard = shard.lock();
        }
        {
            let _guard = shard.lock();
        }
        assert_eq!(shard.contention_attempts(), 2);
    }

    #[test]
    fn test_len_mirror() {
        let mut state = ShardState::with_capacity(2);
        state.slots.push(slot(false));
        let shard = Shard::new(state);
        assert_eq!(shard.len(), 1);
        shard.store_len(0);
        assert_eq!(shard.len(), 0);

        let mut shard = shard;
        let state = shard.state_mut();
        let drained: Vec<_> = state.slots.drain(..).collect();
        for s in drained {
            unsafe { drop(Box::from_raw(s.block.as_ptr())) };
        }
    }
}
