// src/pool/handle.rs
//! Handle to an acquired object.
//!
//! [`PooledObject`] is the typed rendition of the raw payload pointer the
//! pool hands out: it carries the block pointer plus a reference-counted
//! handle on the pool core, derefs to the payload, and runs the release
//! protocol when dropped. Because release only ever happens through the
//! handle, double releases and releases of foreign pointers cannot be
//! expressed; the metadata bounds checks still run on every release to
//! catch header corruption.

use crate::alloc::PoolAllocator;
use crate::pool::block::{SlotAddr, SlotBlock};
use crate::pool::core::PoolCore;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;

/// An object acquired from an [`crate::ObjectPool`].
///
/// Deref/DerefMut expose the payload. Dropping the handle releases the
/// slot and, if backpressure requests are queued, hands the object
/// straight to the oldest waiter.
///
/// The handle keeps the pool core alive, so objects may outlive the
/// `ObjectPool` value they came from; the pool's storage is torn down
/// when the last handle goes.
pub struct PooledObject<T, A: PoolAllocator<T>> {
    core: Arc<PoolCore<T, A>>,
    block: NonNull<SlotBlock<T>>,
}

// SAFETY: the handle is the unique accessor of its payload (the slot is
// marked used for exactly as long as the handle lives), so sending it to
// another thread just moves that unique access; T: Send is all that is
// required. Sharing &PooledObject shares &T, hence T: Sync for Sync.
unsafe impl<T: Send, A: PoolAllocator<T>> Send for PooledObject<T, A> {}
unsafe impl<T: Send + Sync, A: PoolAllocator<T>> Sync for PooledObject<T, A> {}

impl<T, A: PoolAllocator<T>> PooledObject<T, A> {
    /// Wraps a block whose slot has just been marked used.
    pub(crate) fn new(core: Arc<PoolCore<T, A>>, block: NonNull<SlotBlock<T>>) -> Self {
        Self { core, block }
    }

    /// The object's home location, as stamped in its metadata header at
    /// allocation: shard id in the high 16 bits, slot index in the low 48.
    pub fn slot_addr(&self) -> SlotAddr {
        // SAFETY: the block outlives the handle; see Deref.
        unsafe { self.block.as_ref() }.addr()
    }
}

impl<T, A: PoolAllocator<T>> Deref for PooledObject<T, A> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the slot is marked used while this handle exists, so the
        // pool touches the payload only on release paths driven by this
        // handle; the block itself is freed no earlier than pool teardown,
        // which the Arc delays past the last handle.
        unsafe { &self.block.as_ref().payload }
    }
}

impl<T, A: PoolAllocator<T>> DerefMut for PooledObject<T, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as for Deref, plus &mut self makes this the only live
        // borrow of the payload.
        unsafe { &mut self.block.as_mut().payload }
    }
}

impl<T: fmt::Debug, A: PoolAllocator<T>> fmt::Debug for PooledObject<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("addr", &self.slot_addr())
            .field("payload", &**self)
            .finish()
    }
}

impl<T, A: PoolAllocator<T>> Drop for PooledObject<T, A> {
    /// Releases the slot; if a backpressure request is waiting, the object
    /// is re-marked used under the shard lock and delivered to that
    /// waiter's callback after the lock drops.
    fn drop(&mut self) {
        PoolCore::release(&self.core, self.block);
    }
}
