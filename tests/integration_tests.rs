//! End-to-end tests with the MOT provider and a real predictor.

use std::io::Write;
use std::sync::Arc;

use dynamic_prefetch_cache::provider::mot::MotDataProvider;
use dynamic_prefetch_cache::{
    CacheConfig, CacheError, DataProvider, DynamicDataPredictor, DynamicPrefetchCache,
};

const SAMPLE_DATA: &[&str] = &[
    "1,1,100,200,50,75,0.9,125,237",
    "1,2,200,300,60,80,0.8,230,340",
    "2,1,105,205,50,75,0.85,130,242",
    "2,2,205,305,60,80,0.75,235,345",
    "3,1,110,210,50,75,0.9,135,247",
];

fn sample_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in SAMPLE_DATA {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_cache_with_mot_provider() {
    let file = sample_file();
    let provider = Arc::new(MotDataProvider::open(file.path()).await.unwrap());
    let predictor = Arc::new(DynamicDataPredictor::default());
    let cache = DynamicPrefetchCache::new(
        Arc::clone(&provider),
        predictor,
        CacheConfig::default(),
    );

    for frame in 1..=3 {
        let cached = cache.get(frame).await.unwrap();
        let direct = provider.load(frame).await.unwrap();
        assert_eq!(*cached, direct);
        assert_eq!(cached.frame_number, frame);
    }

    let frame1 = cache.get(1).await.unwrap();
    assert_eq!(frame1.detections.len(), 2);
    assert_eq!(frame1.detections[1].track_id, 2);

    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 4);
    assert!(stats.hits >= 1);

    cache.close().await;
}

#[tokio::test]
async fn test_unknown_frame_surfaces_as_load_error() {
    let file = sample_file();
    let provider = Arc::new(MotDataProvider::open(file.path()).await.unwrap());
    let cache = DynamicPrefetchCache::new(
        provider,
        Arc::new(DynamicDataPredictor::default()),
        CacheConfig::default(),
    );

    match cache.get(99).await {
        Err(CacheError::Load { key, cause }) => {
            assert_eq!(key, 99);
            assert!(cause.to_string().contains("frame 99"));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    cache.close().await;
}

#[tokio::test]
async fn test_sequential_scrub_warms_from_prefetch() {
    // A longer synthetic file: 60 frames, one detection each.
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for frame in 1..=60 {
        writeln!(
            file,
            "{frame},1,{}.0,200.0,50.0,75.0,0.9,{}.0,237.0,0.0",
            100 + frame,
            125 + frame
        )
        .unwrap();
    }
    file.flush().unwrap();

    let provider = Arc::new(MotDataProvider::open(file.path()).await.unwrap());
    let config = CacheConfig {
        max_keys_cached: 16,
        max_keys_prefetched: 4,
        history_size: 10,
        ..CacheConfig::default()
    };
    let cache = DynamicPrefetchCache::new(
        Arc::clone(&provider),
        Arc::new(DynamicDataPredictor::default()),
        config,
    );

    for frame in 1..=60 {
        let value = cache.get(frame).await.unwrap();
        assert_eq!(value.frame_number, frame);
        assert_eq!(value.detections.len(), 1);
        // Give the +1 step prefetch a chance to land between accesses.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 60);
    assert!(stats.hits > 0, "sequential scrub should hit prefetched frames");
    assert!(cache.resident_keys().len() <= 16);

    cache.close().await;
}
