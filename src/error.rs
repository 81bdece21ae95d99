// src/error.rs
//! Error taxonomy for pool operations, plus the diagnostic sink.
//!
//! Every failure the pool detects is both reflected in the operation's
//! return value (`None` / `Err`) and reported through the pool's
//! [`ErrorSink`] with a human-readable message. The pool itself never
//! panics on these paths and never aborts the process.

use std::fmt;

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// A pool or object reference was unusable.
    ///
    /// Retained for sink consumers; the safe API cannot produce it because
    /// handles always reference a live pool.
    InvalidPool,
    /// Object metadata is inconsistent, or the allocator's validate hook
    /// rejected the object.
    InvalidObject,
    /// Acquire found no free slot and no callback was supplied.
    Exhausted,
    /// Underlying storage allocation refused.
    AllocationFailed,
    /// Zero or out-of-range argument to create/grow/shrink/grow_queue.
    InvalidSize,
    /// Shrink requested more objects than are free at the shard tails.
    InsufficientUnused,
    /// Acquire with callback could neither enqueue nor grow the queue.
    QueueFull,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPool => write!(f, "Invalid pool or object reference"),
            Self::InvalidObject => write!(f, "Invalid object"),
            Self::Exhausted => write!(f, "Pool exhausted"),
            Self::AllocationFailed => write!(f, "Allocation failed"),
            Self::InvalidSize => write!(f, "Invalid size parameter"),
            Self::InsufficientUnused => write!(f, "Not enough unused objects"),
            Self::QueueFull => write!(f, "Backpressure queue full"),
        }
    }
}

impl std::error::Error for PoolError {}

// ============================================================================
// ERROR CONVERSION - lets the pool compose with io / anyhow error handling
// ============================================================================

/// Convert PoolError to std::io::Error
impl From<PoolError> for std::io::Error {
    fn from(err: PoolError) -> Self {
        use std::io::ErrorKind;
        match err {
            PoolError::Exhausted | PoolError::QueueFull => {
                std::io::Error::new(ErrorKind::WouldBlock, err)
            }
            PoolError::AllocationFailed => std::io::Error::new(ErrorKind::OutOfMemory, err),
            PoolError::InvalidSize => std::io::Error::new(ErrorKind::InvalidInput, err),
            _ => std::io::Error::new(ErrorKind::InvalidData, err),
        }
    }
}

/// Convert PoolError to anyhow::Error
#[cfg(feature = "anyhow")]
impl From<PoolError> for anyhow::Error {
    fn from(err: PoolError) -> Self {
        anyhow::anyhow!("{}", err)
    }
}

// ============================================================================
// RESULT TYPE ALIASES
// ============================================================================

/// Result type alias for pool operations
///
/// Note: When using with other Result types (like anyhow::Result),
/// either qualify the type (`repool::Result<T>`) or use the conversion traits.
pub type Result<T> = std::result::Result<T, PoolError>;

// ============================================================================
// EXTENSION TRAIT FOR EASY CONVERSION
// ============================================================================

/// Extension trait for converting Results between different error types
pub trait ResultExt<T> {
    /// Convert to anyhow::Result
    #[cfg(feature = "anyhow")]
    fn into_anyhow(self) -> anyhow::Result<T>;

    /// Convert to io::Result
    fn into_io(self) -> std::io::Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    #[cfg(feature = "anyhow")]
    fn into_anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| e.into())
    }

    fn into_io(self) -> std::io::Result<T> {
        self.map_err(|e| e.into())
    }
}

// ============================================================================
// ERROR SINK
// ============================================================================

/// Callback receiving every error the pool detects, with a short message.
///
/// Install one via [`crate::ObjectPool::with_error_sink`]. Without a sink
/// the pool writes the message to the standard error stream. The sink runs
/// on whichever thread hit the error and may run while a shard lock is
/// held, so it should not call back into the pool.
pub type ErrorSink = Box<dyn Fn(PoolError, &str) + Send + Sync + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_io() {
        let pool_err = PoolError::Exhausted;
        let io_err: std::io::Error = pool_err.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::WouldBlock);

        let io_err: std::io::Error = PoolError::AllocationFailed.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::OutOfMemory);
    }

    #[test]
    fn test_result_ext() {
        let result: Result<u32> = Ok(42);
        let io_result = result.into_io();
        assert_eq!(io_result.unwrap(), 42);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(PoolError::Exhausted.to_string(), "Pool exhausted");
        assert_eq!(
            PoolError::InsufficientUnused.to_string(),
            "Not enough unused objects"
        );
    }

    #[cfg(feature = "anyhow")]
    #[test]
    fn test_anyhow_conversion() {
        let pool_err = PoolError::QueueFull;
        let anyhow_err: anyhow::Error = pool_err.into();
        assert!(anyhow_err.to_string().contains("queue full"));
    }
}
