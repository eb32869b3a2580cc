//! Out-of-band event stream for cache observability.
//!
//! Events are delivered through an optional callback installed at
//! construction time. The callback is always invoked with the cache-wide
//! mutex released, so re-entrant calls back into the cache are safe
//! (at the caller's own recursion risk).

use std::sync::Arc;

use crate::Key;

/// A notable cache occurrence, carrying the triggering key and, for
/// failures, the rendered error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A client-driven (synchronous) load started.
    LoadStart { key: Key },
    /// A client-driven load committed a value.
    LoadComplete { key: Key },
    /// A client-driven load failed; the error also surfaces to the caller.
    LoadError { key: Key, error: String },
    /// A speculative load was issued.
    PrefetchStart { key: Key },
    /// A speculative load committed a value.
    PrefetchSuccess { key: Key },
    /// A speculative load failed; the error does not surface to clients.
    PrefetchError { key: Key, error: String },
    /// An entry was evicted to honour the resident cap.
    Evict { key: Key },
    /// The worker hit a non-fatal internal problem (e.g. predictor failure).
    WorkerError { error: String },
}

impl CacheEvent {
    /// The key this event concerns, if any.
    pub fn key(&self) -> Option<Key> {
        match self {
            CacheEvent::LoadStart { key }
            | CacheEvent::LoadComplete { key }
            | CacheEvent::LoadError { key, .. }
            | CacheEvent::PrefetchStart { key }
            | CacheEvent::PrefetchSuccess { key }
            | CacheEvent::PrefetchError { key, .. }
            | CacheEvent::Evict { key } => Some(*key),
            CacheEvent::WorkerError { .. } => None,
        }
    }
}

/// Event callback type. Must not block for long and must not panic.
pub type EventSink = Arc<dyn Fn(&CacheEvent) + Send + Sync>;
