//! Data source abstraction and bundled providers.
//!
//! - [`DataProvider`]: the contract the cache loads through
//! - [`mot`]: provider for Multi-Object-Tracking text files

pub mod mot;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::Key;

/// A source of values the cache can load from.
///
/// Implementations must be thread-safe: `load` is called concurrently
/// from client tasks and background prefetch tasks, always with the
/// cache's internal lock released.
#[async_trait]
pub trait DataProvider: Send + Sync + 'static {
    /// Payload type. The cache treats it as opaque.
    type Value: Send + Sync + 'static;

    /// Fetch the value for `key`. May fail with any provider-defined
    /// error; the cache maps failures to `LoadError` (client-driven) or
    /// `prefetch_error` (speculative).
    async fn load(&self, key: Key) -> anyhow::Result<Self::Value>;

    /// Enumerate every valid key. Called rarely; need not be cheap.
    fn available_keys(&self) -> BTreeSet<Key>;

    /// Number of valid keys.
    fn total_keys(&self) -> usize {
        self.available_keys().len()
    }

    /// Relative payload weight, consumed by weight-aware eviction
    /// policies. Defaults to treating all values equally.
    fn value_weight(&self, _value: &Self::Value) -> usize {
        1
    }

    /// Free-form diagnostics, passed through untouched.
    fn stats(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }
}
