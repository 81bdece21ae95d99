// src/pool/stats.rs
//! Pool usage statistics.

/// Snapshot of pool statistics.
///
/// Counters are aggregated shard by shard without a global lock, so a
/// snapshot taken while other threads are active may be slightly
/// inconsistent between fields. These are diagnostics, not correctness
/// inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Highest aggregate used-count ever observed.
    pub max_used: usize,
    /// Total successful acquire operations, including backpressure
    /// deliveries.
    pub acquire_count: usize,
    /// Total release operations.
    pub release_count: usize,
    /// Shard mutex lock attempts.
    pub contention_attempts: usize,
    /// Total nanoseconds spent between requesting and releasing shard
    /// mutexes.
    pub total_contention_time_ns: u64,
    /// Objects currently allocated (create + grow − shrink).
    pub total_objects_allocated: usize,
    /// Number of completed grow operations.
    pub grow_count: usize,
    /// Number of completed shrink operations.
    pub shrink_count: usize,
    /// High-water mark of the backpressure queue.
    pub queue_max_size: usize,
    /// Number of backpressure queue growth operations.
    pub queue_grow_count: usize,
}

impl PoolStats {
    /// Average nanoseconds per shard lock attempt, for quick contention
    /// triage.
    pub fn avg_contention_ns(&self) -> f64 {
        if self.contention_attempts == 0 {
            0.0
        } else {
            self.total_contention_time_ns as f64 / self.contention_attempts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avg_contention_empty() {
        let stats = PoolStats::default();
        assert_eq!(stats.avg_contention_ns(), 0.0);
    }

    #[test]
    fn test_avg_contention() {
        let stats = PoolStats {
            contention_attempts: 4,
            total_contention_time_ns: 1000,
            ..Default::default()
        };
        assert_eq!(stats.avg_contention_ns(), 250.0);
    }
}
