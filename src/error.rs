//! Error types surfaced by the cache's public API.

use std::sync::Arc;

use thiserror::Error;

use crate::Key;

/// Errors returned by [`DynamicPrefetchCache::get`](crate::DynamicPrefetchCache::get).
///
/// Background (prefetch) failures never surface here; they are reported
/// through the event stream and the `prefetch_errors` counter instead.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The provider failed during a client-driven load. The underlying
    /// error is shared so that every waiter on the same load observes
    /// the same failure.
    #[error("load failed for key {key}: {cause}")]
    Load { key: Key, cause: Arc<anyhow::Error> },

    /// The cache has been closed; no further lookups are served.
    #[error("cache is closed")]
    Closed,
}

impl CacheError {
    /// Whether this error is the post-shutdown sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, CacheError::Closed)
    }
}
