// src/pool/core.rs
//! The pool coordinator.
//!
//! [`ObjectPool`] aggregates the shards, the allocator, the error sink and
//! the backpressure queue. Acquire picks a start shard from a thread-local
//! generator and rotates until a shard yields an object; release (driven by
//! [`PooledObject`] drops) decodes the object's metadata header back to its
//! slot and hands the object to the oldest queued waiter, if any.
//!
//! Lock order: shard mutex first, queue mutex second, never inverted.
//! Waiter callbacks fire after the shard lock drops, with the slot already
//! re-marked used, so the object is never visible to two holders and the
//! callback is free to drop its handle (or call back into the pool)
//! without deadlocking.

use crate::alloc::{ByteAllocator, ByteBlock, DefaultAllocator, PoolAllocator};
use crate::error::{ErrorSink, PoolError, Result};
use crate::pool::block::{MAX_SHARD_ID, MAX_SLOT_INDEX, SlotAddr, SlotBlock};
use crate::pool::config::PoolConfig;
use crate::pool::handle::PooledObject;
use crate::pool::queue::{AcquireCallback, WaitQueue};
use crate::pool::shard::{Shard, ShardState, Slot};
use crate::pool::stats::PoolStats;
use crossbeam::utils::CachePadded;
use std::cell::Cell;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Thread-local shard selection
// ---------------------------------------------------------------------------

thread_local! {
    /// Per-thread LCG state for start-shard selection. Zero means "not yet
    /// seeded"; no cross-thread coordination ever touches this.
    static SHARD_RNG: Cell<u64> = const { Cell::new(0) };
}

fn seed_thread_rng() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    let seed = nanos ^ hasher.finish();
    if seed == 0 { 1 } else { seed }
}

/// Next value of the per-thread linear congruential generator.
///
/// Load balancing only needs "different threads usually start on
/// different shards"; generator quality beyond that is wasted.
fn next_shard_random() -> u32 {
    SHARD_RNG.with(|cell| {
        let mut state = cell.get();
        if state == 0 {
            state = seed_thread_rng();
        }
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        cell.set(state);
        (state >> 32) as u32
    })
}

// ---------------------------------------------------------------------------
// Pool core
// ---------------------------------------------------------------------------

fn report_to(sink: &Option<ErrorSink>, error: PoolError, message: &str) {
    match sink {
        Some(cb) => cb(error, message),
        None => eprintln!("{message}"),
    }
}

/// Shared pool state. Kept alive by the [`ObjectPool`] value and by every
/// outstanding [`PooledObject`]; teardown runs when the last reference
/// goes, which is what makes destroy-vs-outstanding-object races
/// unrepresentable.
pub(crate) struct PoolCore<T, A: PoolAllocator<T>> {
    shards: Box<[CachePadded<Shard<T>>]>,
    allocator: A,
    sink: Option<ErrorSink>,
    queue: WaitQueue<T, A>,
    grow_count: AtomicUsize,
    shrink_count: AtomicUsize,
    total_objects_allocated: AtomicUsize,
    max_used: AtomicUsize,
}

fn build_slot<T, A: PoolAllocator<T>>(allocator: &A, shard: u16, index: u64) -> Result<Slot<T>> {
    let payload = allocator.construct()?;
    let mut block = SlotBlock::new(SlotAddr::pack(shard, index), payload);
    allocator.reset(&mut block.payload);
    allocator.on_create(&mut block.payload);
    Ok(Slot {
        block: NonNull::from(Box::leak(block)),
        used: false,
    })
}

fn destroy_slots<T, A: PoolAllocator<T>>(allocator: &A, state: &mut ShardState<T>) {
    for slot in state.slots.drain(..) {
        // SAFETY: the slot owns its block and the caller guarantees no
        // handle references it (teardown paths only run on free slots or
        // after the last pool reference is gone).
        unsafe {
            let mut block = Box::from_raw(slot.block.as_ptr());
            allocator.on_destroy(&mut block.payload);
        }
    }
}

impl<T, A: PoolAllocator<T>> PoolCore<T, A> {
    pub(crate) fn report(&self, error: PoolError, message: &str) {
        report_to(&self.sink, error, message);
    }

    fn capacity(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    fn used_count(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().used_count).sum()
    }

    /// Re-reads the aggregate used count and raises the global high-water
    /// mark; runs after every successful acquire, outside shard locks.
    fn note_used_high_water(&self) {
        let used = self.used_count();
        self.max_used.fetch_max(used, Ordering::Relaxed);
    }

    fn try_acquire_in_shard(&self, shard_id: usize) -> Option<NonNull<SlotBlock<T>>> {
        let shard = &self.shards[shard_id];
        let mut state = shard.lock();
        if state.used_count >= state.slots.len() {
            return None;
        }
        for index in 0..state.slots.len() {
            if state.slots[index].used {
                continue;
            }
            let block = state.slots[index].block;
            // SAFETY: the slot is free and the shard lock is held, so the
            // pool is the only accessor of this payload.
            let valid = unsafe { self.allocator.validate(&(*block.as_ptr()).payload) };
            if !valid {
                self.report(
                    PoolError::InvalidObject,
                    "Skipping pooled object that failed validation",
                );
                continue;
            }
            state.slots[index].used = true;
            state.used_count += 1;
            if state.used_count > state.max_used {
                state.max_used = state.used_count;
            }
            state.acquire_count += 1;
            // SAFETY: as above; the slot is now marked used and the block
            // will be handed to exactly one caller.
            unsafe {
                let payload = &mut (*block.as_ptr()).payload;
                self.allocator.reset(payload);
                self.allocator.on_reuse(payload);
            }
            return Some(block);
        }
        None
    }

    /// Release protocol, driven by [`PooledObject::drop`].
    pub(crate) fn release(this: &Arc<Self>, block: NonNull<SlotBlock<T>>) {
        // SAFETY: the handle being dropped is the sole owner of the block.
        let addr = unsafe { block.as_ref() }.addr();
        let Some(shard) = this.shards.get(usize::from(addr.shard())) else {
            this.report(
                PoolError::InvalidObject,
                "Object metadata names a shard out of range",
            );
            return;
        };
        let index = addr.index() as usize;

        let mut state = shard.lock();
        let located = state.slots.get(index).is_some_and(|slot| slot.block == block);
        if !located {
            drop(state);
            this.report(
                PoolError::InvalidObject,
                "Object metadata does not match its slot",
            );
            return;
        }
        // SAFETY: slot located and lock held; no other accessor.
        let valid = unsafe { this.allocator.validate(&block.as_ref().payload) };
        if !valid {
            // The slot stays marked used: a failing object is withdrawn
            // from circulation rather than handed to the next acquirer.
            drop(state);
            this.report(PoolError::InvalidObject, "Object failed validation on release");
            return;
        }
        if !state.slots[index].used {
            drop(state);
            this.report(
                PoolError::InvalidObject,
                "Release of an object that is not in use",
            );
            return;
        }

        state.slots[index].used = false;
        state.used_count -= 1;
        state.release_count += 1;
        // SAFETY: slot now free, lock held.
        unsafe {
            this.allocator.reset(&mut (*block.as_ptr()).payload);
        }

        // Drain one waiter if any are queued. The queue lock nests inside
        // the shard lock; the re-mark happens before the shard lock drops,
        // so the popped waiter can never race a competing acquire.
        let mut fired: Option<AcquireCallback<T, A>> = None;
        if this.queue.len() > 0 {
            if let Some(callback) = this.queue.pop() {
                state.slots[index].used = true;
                state.used_count += 1;
                if state.used_count > state.max_used {
                    state.max_used = state.used_count;
                }
                state.acquire_count += 1;
                // SAFETY: slot re-marked used under the lock; the waiter
                // becomes the sole holder.
                unsafe {
                    this.allocator.on_reuse(&mut (*block.as_ptr()).payload);
                }
                fired = Some(callback);
            }
        }
        drop(state);

        if let Some(callback) = fired {
            callback(PooledObject::new(Arc::clone(this), block));
            this.note_used_high_water();
        }
    }
}

impl<T, A: PoolAllocator<T>> Drop for PoolCore<T, A> {
    /// Tears down every object: on_destroy, then free. Runs once the last
    /// handle on the pool is gone, so no slot can still be in use.
    fn drop(&mut self) {
        let PoolCore {
            shards, allocator, ..
        } = self;
        for shard in shards.iter_mut() {
            destroy_slots(allocator, shard.state_mut());
        }
    }
}

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

/// Outcome of [`ObjectPool::acquire_or_queue`].
pub enum AcquireOutcome<T, A: PoolAllocator<T>> {
    /// A free slot was available; the object is delivered inline.
    Ready(PooledObject<T, A>),
    /// The pool was exhausted; the callback was enqueued and will fire,
    /// exactly once, on a future release.
    Enqueued,
}

impl<T, A: PoolAllocator<T>> AcquireOutcome<T, A> {
    /// The object, when the acquire completed inline.
    pub fn ready(self) -> Option<PooledObject<T, A>> {
        match self {
            Self::Ready(obj) => Some(obj),
            Self::Enqueued => None,
        }
    }

    /// `true` when the request was parked on the backpressure queue.
    pub fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued)
    }
}

/// Sharded, thread-safe pool of pre-allocated reusable objects.
///
/// The pool pre-allocates `capacity` objects through a [`PoolAllocator`]
/// and partitions them into shards, each behind its own mutex. Acquire
/// rotates over the shards starting from a per-thread random index;
/// release is automatic when the returned [`PooledObject`] drops. When the
/// pool is exhausted, [`acquire_or_queue`](Self::acquire_or_queue) parks a
/// callback that fires as soon as an object is released.
///
/// # Thread Safety
///
/// Share the pool across threads via `Arc`. Any operation may be called
/// from any thread; destruction happens automatically after the pool value
/// and every outstanding object handle are gone.
///
/// # Example
///
/// ```rust
/// use repool::{ByteAllocator, ObjectPool, PoolConfig};
///
/// let pool = ObjectPool::new(
///     PoolConfig { capacity: 8, shard_count: 2, queue_capacity: 16 },
///     ByteAllocator::new(256),
/// )?;
///
/// let mut obj = pool.acquire().expect("pool is fresh");
/// obj.as_mut_slice()[0] = 0xAB;
/// drop(obj); // slot freed, payload reset to zero
///
/// assert_eq!(pool.capacity(), 8);
/// assert_eq!(pool.used_count(), 0);
/// # Ok::<(), repool::PoolError>(())
/// ```
pub struct ObjectPool<T, A: PoolAllocator<T>> {
    core: Arc<PoolCore<T, A>>,
}

impl<T, A> ObjectPool<T, A>
where
    T: Send + 'static,
    A: PoolAllocator<T> + 'static,
{
    /// Creates a pool with `config.capacity` objects spread over
    /// `config.shard_count` shards.
    ///
    /// Capacity distribution: the first `capacity % shard_count` shards
    /// get one extra slot. When `capacity < shard_count`, the first
    /// `capacity` shards get a single slot and the rest get none, so the
    /// pool's capacity always equals the request.
    ///
    /// Errors with `InvalidSize` for a zero capacity, a zero or too-large
    /// shard count, or a shard that would exceed the 48-bit slot index
    /// space. If any object fails to construct, everything built so far is
    /// torn down (on_destroy, then free) before the error returns.
    pub fn new(config: PoolConfig, allocator: A) -> Result<Self> {
        Self::build(config, allocator, None)
    }

    /// As [`new`](Self::new), with an error sink receiving every
    /// diagnostic the pool emits. Without a sink, messages go to stderr.
    pub fn with_error_sink(config: PoolConfig, allocator: A, sink: ErrorSink) -> Result<Self> {
        Self::build(config, allocator, Some(sink))
    }

    fn build(config: PoolConfig, allocator: A, sink: Option<ErrorSink>) -> Result<Self> {
        if config.capacity == 0 || config.shard_count == 0 {
            report_to(
                &sink,
                PoolError::InvalidSize,
                "Invalid pool capacity or shard count",
            );
            return Err(PoolError::InvalidSize);
        }
        if config.shard_count > MAX_SHARD_ID {
            report_to(&sink, PoolError::InvalidSize, "Shard count exceeds 16 bits");
            return Err(PoolError::InvalidSize);
        }

        let base = config.capacity / config.shard_count;
        let remainder = config.capacity % config.shard_count;
        let mut states: Vec<ShardState<T>> = Vec::with_capacity(config.shard_count);

        for shard_id in 0..config.shard_count {
            let size = base + usize::from(shard_id < remainder);
            if size as u64 > MAX_SLOT_INDEX {
                report_to(&sink, PoolError::InvalidSize, "Shard size exceeds 48 bits");
                for mut state in states {
                    destroy_slots(&allocator, &mut state);
                }
                return Err(PoolError::InvalidSize);
            }
            let mut state = ShardState::with_capacity(size);
            for index in 0..size {
                match build_slot(&allocator, shard_id as u16, index as u64) {
                    Ok(slot) => state.slots.push(slot),
                    Err(err) => {
                        report_to(&sink, err, "Failed to allocate pooled object");
                        destroy_slots(&allocator, &mut state);
                        for mut built in states {
                            destroy_slots(&allocator, &mut built);
                        }
                        return Err(err);
                    }
                }
            }
            states.push(state);
        }

        let shards: Box<[CachePadded<Shard<T>>]> = states
            .into_iter()
            .map(|state| CachePadded::new(Shard::new(state)))
            .collect();

        Ok(Self {
            core: Arc::new(PoolCore {
                shards,
                allocator,
                sink,
                queue: WaitQueue::new(config.queue_capacity),
                grow_count: AtomicUsize::new(0),
                shrink_count: AtomicUsize::new(0),
                total_objects_allocated: AtomicUsize::new(config.capacity),
                max_used: AtomicUsize::new(0),
            }),
        })
    }

    /// Acquires an object, or returns `None` (reporting `Exhausted`) when
    /// every shard is full.
    pub fn acquire(&self) -> Option<PooledObject<T, A>> {
        match self.try_acquire() {
            Some(obj) => Some(obj),
            None => {
                self.core.report(PoolError::Exhausted, "Pool exhausted");
                None
            }
        }
    }

    /// Acquires an object, or parks `callback` on the backpressure queue.
    ///
    /// A parked callback fires exactly once, on the releasing thread of a
    /// future release, receiving the released object already marked used.
    /// Queue capacity doubles on demand; if growth fails, the callback is
    /// discarded and `QueueFull` is reported and returned.
    pub fn acquire_or_queue<F>(&self, callback: F) -> Result<AcquireOutcome<T, A>>
    where
        F: FnOnce(PooledObject<T, A>) + Send + 'static,
    {
        if let Some(obj) = self.try_acquire() {
            return Ok(AcquireOutcome::Ready(obj));
        }
        match self.core.queue.enqueue(Box::new(callback)) {
            Ok(()) => Ok(AcquireOutcome::Enqueued),
            Err(_) => {
                self.core.report(PoolError::QueueFull, "Request queue full");
                Err(PoolError::QueueFull)
            }
        }
    }

    fn try_acquire(&self) -> Option<PooledObject<T, A>> {
        let core = &self.core;
        let shard_count = core.shards.len();
        let start = next_shard_random() as usize % shard_count;
        for attempt in 0..shard_count {
            let shard_id = (start + attempt) % shard_count;
            if let Some(block) = core.try_acquire_in_shard(shard_id) {
                core.note_used_high_water();
                return Some(PooledObject::new(Arc::clone(core), block));
            }
        }
        None
    }

    /// Adds `additional` objects, spread over the shards like the initial
    /// capacity.
    ///
    /// On failure, objects already added stay in the pool (and are counted
    /// in the stats); the error describes the first shard that could not
    /// be extended.
    pub fn grow(&self, additional: usize) -> Result<()> {
        let core = &self.core;
        if additional == 0 {
            core.report(PoolError::InvalidSize, "Grow size must be non-zero");
            return Err(PoolError::InvalidSize);
        }

        let shard_count = core.shards.len();
        let base = additional / shard_count;
        let remainder = additional % shard_count;
        let mut added_total = 0usize;
        let mut failure = None;

        'shards: for shard_id in 0..shard_count {
            let add = base + usize::from(shard_id < remainder);
            if add == 0 {
                continue;
            }
            let shard = &core.shards[shard_id];
            let mut state = shard.lock();
            if (state.slots.len() + add) as u64 > MAX_SLOT_INDEX {
                core.report(PoolError::InvalidSize, "Shard size would exceed 48 bits");
                failure = Some(PoolError::InvalidSize);
                break;
            }
            if state.slots.try_reserve_exact(add).is_err() {
                core.report(PoolError::AllocationFailed, "Failed to extend slot table");
                failure = Some(PoolError::AllocationFailed);
                break;
            }
            for _ in 0..add {
                let index = state.slots.len() as u64;
                match build_slot(&core.allocator, shard_id as u16, index) {
                    Ok(slot) => {
                        state.slots.push(slot);
                        added_total += 1;
                    }
                    Err(err) => {
                        core.report(err, "Failed to allocate pooled object during grow");
                        shard.store_len(state.slots.len());
                        failure = Some(err);
                        break 'shards;
                    }
                }
            }
            shard.store_len(state.slots.len());
        }

        core.total_objects_allocated
            .fetch_add(added_total, Ordering::Relaxed);
        match failure {
            None => {
                core.grow_count.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Some(err) => Err(err),
        }
    }

    /// Removes `reduce` objects from the shard tails.
    ///
    /// All-or-nothing: every affected shard is locked and checked before
    /// any object is destroyed, so a failed shrink leaves the pool exactly
    /// as it was. Fails with `InsufficientUnused` when any shard's tail
    /// holds fewer contiguous free slots than its share of the reduction.
    pub fn shrink(&self, reduce: usize) -> Result<()> {
        let core = &self.core;
        if reduce == 0 || reduce > core.capacity() {
            core.report(
                PoolError::InvalidSize,
                "Shrink size must be non-zero and within capacity",
            );
            return Err(PoolError::InvalidSize);
        }

        let shard_count = core.shards.len();
        let base = reduce / shard_count;
        let remainder = reduce % shard_count;
        let cuts: Vec<usize> = (0..shard_count)
            .map(|shard_id| base + usize::from(shard_id < remainder))
            .collect();

        // Phase 1: take every affected shard lock in ascending order (the
        // crate-wide order; nothing takes two shard locks any other way)
        // and verify the tails. No mutation happens until all checks pass.
        let mut guards = Vec::with_capacity(shard_count);
        for (shard_id, &cut) in cuts.iter().enumerate() {
            if cut == 0 {
                guards.push(None);
                continue;
            }
            let guard = core.shards[shard_id].lock();
            if guard.tail_free() < cut {
                core.report(
                    PoolError::InsufficientUnused,
                    "Not enough unused objects to shrink",
                );
                return Err(PoolError::InsufficientUnused);
            }
            guards.push(Some(guard));
        }

        // Phase 2: destroy the tails. No fallible step remains.
        for (shard_id, guard) in guards.iter_mut().enumerate() {
            let Some(state) = guard.as_deref_mut() else {
                continue;
            };
            let new_len = state.slots.len() - cuts[shard_id];
            for slot in state.slots.drain(new_len..) {
                // SAFETY: phase 1 verified these tail slots are free, and
                // their shard locks are still held.
                unsafe {
                    let mut block = Box::from_raw(slot.block.as_ptr());
                    core.allocator.on_destroy(&mut block.payload);
                }
            }
            if state.max_used > state.slots.len() {
                state.max_used = state.slots.len();
            }
            core.shards[shard_id].store_len(state.slots.len());
        }
        drop(guards);

        core.shrink_count.fetch_add(1, Ordering::Relaxed);
        core.total_objects_allocated
            .fetch_sub(reduce, Ordering::Relaxed);
        Ok(())
    }

    /// Adds `additional` capacity to the backpressure queue.
    pub fn grow_queue(&self, additional: usize) -> Result<()> {
        let core = &self.core;
        if additional == 0 {
            core.report(PoolError::InvalidSize, "Queue grow size must be non-zero");
            return Err(PoolError::InvalidSize);
        }
        core.queue.grow(additional).inspect_err(|&err| {
            core.report(err, "Failed to grow request queue");
        })
    }

    /// Total number of slots across all shards. Lock-free.
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    /// Number of objects currently held by callers, summed shard by shard
    /// under each shard's lock.
    pub fn used_count(&self) -> usize {
        self.core.used_count()
    }

    /// Number of backpressure requests currently waiting.
    pub fn queued_requests(&self) -> usize {
        self.core.queue.len()
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.core.shards.len()
    }

    /// Aggregated usage statistics.
    pub fn stats(&self) -> PoolStats {
        let core = &self.core;
        let mut stats = PoolStats {
            max_used: core.max_used.load(Ordering::Relaxed),
            total_objects_allocated: core.total_objects_allocated.load(Ordering::Relaxed),
            grow_count: core.grow_count.load(Ordering::Relaxed),
            shrink_count: core.shrink_count.load(Ordering::Relaxed),
            ..Default::default()
        };
        for shard in core.shards.iter() {
            {
                let state = shard.lock();
                stats.acquire_count += state.acquire_count;
                stats.release_count += state.release_count;
            }
            stats.contention_attempts += shard.contention_attempts();
            stats.total_contention_time_ns += shard.contention_time_ns();
        }
        let (queue_max_size, queue_grow_count) = core.queue.counters();
        stats.queue_max_size = queue_max_size;
        stats.queue_grow_count = queue_grow_count;
        stats
    }

    /// Per-shard acquire counts, in shard order.
    pub fn shard_acquire_counts(&self) -> Vec<usize> {
        self.core
            .shards
            .iter()
            .map(|shard| shard.lock().acquire_count)
            .collect()
    }
}

impl<T: Default + Send + 'static> ObjectPool<T, DefaultAllocator> {
    /// Creates a pool of `T::default()` objects using
    /// [`DefaultAllocator`].
    pub fn with_default_allocator(config: PoolConfig) -> Result<Self> {
        Self::new(config, DefaultAllocator)
    }
}

/// Pool of fixed-size zeroed byte payloads, the default pool flavour.
pub type BytePool = ObjectPool<ByteBlock, ByteAllocator>;

impl ObjectPool<ByteBlock, ByteAllocator> {
    /// Creates a byte pool with the default configuration (16 objects, 4
    /// shards). `object_size` of zero selects the default payload size.
    pub fn with_defaults(object_size: usize) -> Result<Self> {
        let size = if object_size == 0 {
            crate::alloc::DEFAULT_OBJECT_SIZE
        } else {
            object_size
        };
        Self::new(PoolConfig::default(), ByteAllocator::new(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capture_sink() -> (ErrorSink, Arc<Mutex<Vec<PoolError>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: ErrorSink = Box::new(move |err, _msg| {
            sink_seen.lock().unwrap().push(err);
        });
        (sink, seen)
    }

    #[test]
    fn test_create_rejects_zero_sizes() {
        let cfg = PoolConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(
            ObjectPool::<u64, _>::with_default_allocator(cfg).err(),
            Some(PoolError::InvalidSize)
        );

        let cfg = PoolConfig {
            shard_count: 0,
            ..Default::default()
        };
        assert_eq!(
            ObjectPool::<u64, _>::with_default_allocator(cfg).err(),
            Some(PoolError::InvalidSize)
        );
    }

    #[test]
    fn test_create_rejects_oversized_shard_count() {
        let cfg = PoolConfig {
            capacity: 1 << 17,
            shard_count: (1 << 16) + 1,
            queue_capacity: 4,
        };
        let (sink, seen) = capture_sink();
        let result = ObjectPool::<u64, _>::with_error_sink(cfg, DefaultAllocator, sink);
        assert_eq!(result.err(), Some(PoolError::InvalidSize));
        assert_eq!(seen.lock().unwrap().as_slice(), &[PoolError::InvalidSize]);
    }

    #[test]
    fn test_capacity_distribution_uneven() {
        let pool = ObjectPool::<u64, _>::with_default_allocator(PoolConfig {
            capacity: 7,
            shard_count: 3,
            queue_capacity: 4,
        })
        .unwrap();
        assert_eq!(pool.capacity(), 7);
        // 3 + 2 + 2: first `7 % 3` shards take the extra slot.
        let held: Vec<_> = (0..7).map(|_| pool.acquire().unwrap()).collect();
        let mut per_shard = [0usize; 3];
        for obj in &held {
            per_shard[usize::from(obj.slot_addr().shard())] += 1;
        }
        assert_eq!(per_shard, [3, 2, 2]);
    }

    #[test]
    fn test_capacity_smaller_than_shard_count() {
        let pool = ObjectPool::<u64, _>::with_default_allocator(PoolConfig {
            capacity: 2,
            shard_count: 4,
            queue_capacity: 4,
        })
        .unwrap();
        assert_eq!(pool.capacity(), 2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        drop((a, b));
        assert_eq!(pool.used_count(), 0);
    }

    #[test]
    fn test_handle_addr_matches_slot() {
        let pool = ObjectPool::<u64, _>::with_default_allocator(PoolConfig {
            capacity: 6,
            shard_count: 2,
            queue_capacity: 4,
        })
        .unwrap();
        let held: Vec<_> = (0..6).map(|_| pool.acquire().unwrap()).collect();
        let mut addrs: Vec<_> = held.iter().map(|obj| obj.slot_addr()).collect();
        addrs.sort_by_key(|a| (a.shard(), a.index()));
        addrs.dedup();
        assert_eq!(addrs.len(), 6, "addresses must be distinct");
        for addr in addrs {
            assert!(usize::from(addr.shard()) < pool.shard_count());
            assert!((addr.index() as usize) < 3);
        }
    }

    #[test]
    fn test_thread_local_rng_stays_in_range() {
        for _ in 0..64 {
            let idx = next_shard_random() as usize % 5;
            assert!(idx < 5);
        }
    }

    #[test]
    fn test_objects_outlive_pool_value() {
        let pool = ObjectPool::<u64, _>::with_default_allocator(PoolConfig {
            capacity: 2,
            shard_count: 1,
            queue_capacity: 4,
        })
        .unwrap();
        let mut obj = pool.acquire().unwrap();
        drop(pool);
        *obj = 99;
        assert_eq!(*obj, 99);
        // Core teardown runs here, after the last handle.
    }
}
