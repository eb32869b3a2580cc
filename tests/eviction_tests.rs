//! Eviction policy behaviour, standalone and through the cache.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use dynamic_prefetch_cache::{
    AccessPredictor, CacheConfig, DataProvider, DynamicPrefetchCache, EntryMeta, EvictionPolicy,
    Key, LargestFirst, OldestFirst, SmallestFirst,
};

fn meta(key: Key, sequence: u64, weight: usize) -> EntryMeta {
    EntryMeta {
        key,
        insertion_sequence: sequence,
        weight,
    }
}

#[test]
fn test_oldest_first_orders_by_insertion() {
    let entries = vec![meta(7, 3, 1), meta(8, 1, 1), meta(9, 2, 1)];
    assert_eq!(OldestFirst.select_victims(&entries, 3), vec![8, 9, 7]);
}

#[test]
fn test_largest_first_orders_by_weight() {
    let entries = vec![meta(1, 0, 2), meta(2, 1, 8), meta(3, 2, 5)];
    assert_eq!(LargestFirst.select_victims(&entries, 2), vec![2, 3]);
}

#[test]
fn test_smallest_first_orders_by_weight() {
    let entries = vec![meta(1, 0, 2), meta(2, 1, 8), meta(3, 2, 5)];
    assert_eq!(SmallestFirst.select_victims(&entries, 2), vec![1, 3]);
}

/// Provider whose payload weight equals the key, for weight-aware tests.
struct WeightedProvider;

#[async_trait]
impl DataProvider for WeightedProvider {
    type Value = Vec<u8>;

    async fn load(&self, key: Key) -> anyhow::Result<Vec<u8>> {
        Ok(vec![0u8; key as usize])
    }

    fn available_keys(&self) -> BTreeSet<Key> {
        (0..100).collect()
    }

    fn value_weight(&self, value: &Vec<u8>) -> usize {
        value.len()
    }
}

/// Predictor that never speculates.
struct SilentPredictor;

impl AccessPredictor for SilentPredictor {
    fn likelihoods(&self, _current: Key, _history: &[Key]) -> anyhow::Result<HashMap<Key, f64>> {
        Ok(HashMap::new())
    }
}

fn config(cached: usize) -> CacheConfig {
    CacheConfig {
        max_keys_cached: cached,
        max_keys_prefetched: 0,
        history_size: 10,
        ..CacheConfig::default()
    }
}

#[tokio::test]
async fn test_cache_evicts_oldest_when_over_cap() {
    let cache = DynamicPrefetchCache::new(
        Arc::new(WeightedProvider),
        Arc::new(SilentPredictor),
        config(2),
    );

    cache.get(10).await.unwrap();
    cache.get(11).await.unwrap();
    cache.get(12).await.unwrap();

    assert_eq!(cache.resident_keys(), vec![11, 12]);
    assert_eq!(cache.stats().evictions, 1);

    cache.close().await;
}

#[tokio::test]
async fn test_cache_with_largest_first_policy() {
    let cache = DynamicPrefetchCache::builder(Arc::new(WeightedProvider), Arc::new(SilentPredictor))
        .config(config(2))
        .eviction_policy(LargestFirst)
        .build();

    cache.get(50).await.unwrap();
    cache.get(10).await.unwrap();
    cache.get(30).await.unwrap();

    // 50 carries the largest payload and is shed first.
    let resident = cache.resident_keys();
    assert_eq!(resident.len(), 2);
    assert!(resident.contains(&10));
    assert!(resident.contains(&30));

    cache.close().await;
}

#[tokio::test]
async fn test_reaccess_after_eviction_reloads() {
    let cache = DynamicPrefetchCache::new(
        Arc::new(WeightedProvider),
        Arc::new(SilentPredictor),
        config(2),
    );

    cache.get(1).await.unwrap();
    cache.get(2).await.unwrap();
    cache.get(3).await.unwrap(); // evicts 1
    cache.get(1).await.unwrap(); // must reload, evicting 2

    let stats = cache.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 4);
    assert_eq!(stats.evictions, 2);
    assert_eq!(cache.resident_keys(), vec![3, 1]);

    cache.close().await;
}
