// src/alloc.rs
//! Pluggable per-object allocators.
//!
//! An allocator tells the pool how to construct, reset and validate one
//! object, and lets callers observe object lifecycle transitions. The pool
//! calls these hooks under shard locks, so they should be cheap and must
//! not call back into the pool.
//!
//! Hook schedule:
//! - `construct` once per slot, at pool creation or grow;
//! - `reset` on every transition into the free state and again on the
//!   acquire path, immediately before `on_reuse`;
//! - `on_create` once, right after the first reset;
//! - `on_reuse` every time the object is handed to a caller;
//! - `on_destroy` once, before the object is freed by shrink or pool drop.

use crate::error::Result;
use zeroize::Zeroize;

/// Default payload size for [`ByteAllocator`] when none is given.
pub const DEFAULT_OBJECT_SIZE: usize = 64;

/// Allocator interface for custom object management.
///
/// `construct` and `reset` are mandatory; `validate` defaults to accepting
/// everything and the observer hooks default to no-ops. The allocator is
/// shared by every thread using the pool and is never mutated after pool
/// creation, hence the `Send + Sync` bound.
///
/// # Example
///
/// ```rust
/// use repool::{PoolAllocator, Result};
///
/// struct Message {
///     id: u64,
///     body: Vec<u8>,
/// }
///
/// struct MessageAllocator {
///     body_capacity: usize,
/// }
///
/// impl PoolAllocator<Message> for MessageAllocator {
///     fn construct(&self) -> Result<Message> {
///         Ok(Message {
///             id: 0,
///             body: Vec::with_capacity(self.body_capacity),
///         })
///     }
///
///     fn reset(&self, obj: &mut Message) {
///         obj.id = 0;
///         obj.body.clear();
///     }
/// }
/// ```
pub trait PoolAllocator<T>: Send + Sync {
    /// Builds one object in its canonical state.
    ///
    /// Failure is reported as `AllocationFailed`; during pool creation it
    /// rolls back every object constructed so far, during grow it keeps
    /// the partial progress.
    fn construct(&self) -> Result<T>;

    /// Returns the object to its canonical state.
    fn reset(&self, obj: &mut T);

    /// Cheap integrity check run before every handoff.
    fn validate(&self, _obj: &T) -> bool {
        true
    }

    /// Observer hook: the object has just been constructed.
    fn on_create(&self, _obj: &mut T) {}

    /// Observer hook: the object is about to be freed.
    fn on_destroy(&self, _obj: &mut T) {}

    /// Observer hook: the object is being handed to a caller.
    fn on_reuse(&self, _obj: &mut T) {}
}

/// Allocator for any `T: Default`, using `Default::default()` as the
/// canonical state for both construction and reset.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocator;

impl<T: Default + Send> PoolAllocator<T> for DefaultAllocator {
    fn construct(&self) -> Result<T> {
        Ok(T::default())
    }

    fn reset(&self, obj: &mut T) {
        *obj = T::default();
    }
}

/// Fixed-size byte payload used by the default pool flavour.
///
/// The canonical state is all-zero; reset uses [`zeroize`] so stale caller
/// data cannot survive into the next acquirer, and the bytes are also
/// zeroed when the payload is dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct ByteBlock {
    bytes: Box<[u8]>,
}

impl ByteBlock {
    fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Payload size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the payload has zero size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read access to the payload bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Write access to the payload bytes.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl std::ops::Deref for ByteBlock {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl std::ops::DerefMut for ByteBlock {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}

/// Allocator producing zeroed [`ByteBlock`] payloads of a fixed size.
///
/// This is the Rust rendition of a generic "just give me N bytes" pool
/// object: construct allocates a zero-filled block, reset zeroizes it,
/// validate checks the size is still the configured one.
#[derive(Debug, Clone, Copy)]
pub struct ByteAllocator {
    object_size: usize,
}

impl ByteAllocator {
    /// Creates an allocator for payloads of `object_size` bytes.
    pub fn new(object_size: usize) -> Self {
        Self { object_size }
    }

    /// Configured payload size.
    #[inline]
    pub fn object_size(&self) -> usize {
        self.object_size
    }
}

impl Default for ByteAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_OBJECT_SIZE)
    }
}

impl PoolAllocator<ByteBlock> for ByteAllocator {
    fn construct(&self) -> Result<ByteBlock> {
        Ok(ByteBlock::new(self.object_size))
    }

    fn reset(&self, obj: &mut ByteBlock) {
        obj.bytes.zeroize();
    }

    fn validate(&self, obj: &ByteBlock) -> bool {
        obj.len() == self.object_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_allocator_construct() {
        let alloc = ByteAllocator::new(128);
        let block = alloc.construct().unwrap();
        assert_eq!(block.len(), 128);
        assert!(block.iter().all(|&b| b == 0));
        assert!(alloc.validate(&block));
    }

    #[test]
    fn test_byte_allocator_reset_zeroizes() {
        let alloc = ByteAllocator::new(32);
        let mut block = alloc.construct().unwrap();
        block.as_mut_slice().fill(0xAB);
        alloc.reset(&mut block);
        assert!(block.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_byte_allocator_validate_size() {
        let alloc = ByteAllocator::new(16);
        let other = ByteBlock::new(8);
        assert!(!alloc.validate(&other));
    }

    #[test]
    fn test_default_allocator_roundtrip() {
        let alloc = DefaultAllocator;
        let mut v: Vec<u8> = alloc.construct().unwrap();
        v.extend_from_slice(b"dirty");
        alloc.reset(&mut v);
        assert!(v.is_empty());
    }
}
