//! Counter snapshot exposed through [`DynamicPrefetchCache::stats`](crate::DynamicPrefetchCache::stats).

/// Point-in-time cache counters.
///
/// All counters are updated under the cache-wide mutex;
/// `active_prefetch_tasks` is derived from the in-flight table at
/// snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the resident store.
    pub hits: u64,
    /// Lookups that had to wait for a load (fresh or already in flight).
    pub misses: u64,
    /// Speculative loads dispatched.
    pub prefetch_issued: u64,
    /// Speculative loads that committed a value.
    pub prefetch_completed: u64,
    /// Speculative loads cancelled before their result was used.
    pub prefetch_cancelled: u64,
    /// Speculative loads that failed in the provider.
    pub prefetch_errors: u64,
    /// Entries evicted to honour the resident cap.
    pub evictions: u64,
    /// Speculative loads currently in flight.
    pub active_prefetch_tasks: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the resident store (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}
