//! dynamic-prefetch-cache: predictive prefetching for frame-indexed data.
//!
//! A keyed in-memory cache that speculatively pre-loads the entries it
//! expects to be requested next. A pluggable [`AccessPredictor`] scores
//! candidate keys after every access; a background worker keeps a bounded
//! set of prefetch loads converged on the current best prediction while
//! clients issue point lookups through [`DynamicPrefetchCache::get`].
//!
//! Ships with a [`MotDataProvider`](provider::mot::MotDataProvider) for
//! Multi-Object-Tracking text files and a family of navigation-aware
//! predictors for frame-scrubbing workloads.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod predictors;
pub mod provider;

/// Cache key: a frame number or any other dense integer identifier.
pub type Key = u64;

pub use cache::evictor::{EntryMeta, EvictionPolicy, LargestFirst, OldestFirst, SmallestFirst};
pub use cache::stats::CacheStats;
pub use cache::{CacheBuilder, DynamicPrefetchCache};
pub use config::CacheConfig;
pub use error::CacheError;
pub use events::CacheEvent;
pub use predictors::{
    AccessPredictor, DistanceDecayPredictor, DynamicDataPredictor, DynamicDistanceDecayPredictor,
};
pub use provider::DataProvider;
