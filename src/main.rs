//! Demo driver: replay a synthetic access pattern over a MOT data file
//! through the prefetching cache and report hit rates.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{debug, info};

use dynamic_prefetch_cache::config::{AccessPattern, CacheConfig, Cli};
use dynamic_prefetch_cache::predictors::DynamicDataPredictor;
use dynamic_prefetch_cache::provider::mot::MotDataProvider;
use dynamic_prefetch_cache::provider::DataProvider;
use dynamic_prefetch_cache::DynamicPrefetchCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "dynamic_prefetch_cache=debug"
    } else {
        "dynamic_prefetch_cache=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("dynamic-prefetch-cache v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => CacheConfig::load(path)?,
        None => CacheConfig::default(),
    };

    info!(
        max_keys_cached = config.max_keys_cached,
        max_keys_prefetched = config.max_keys_prefetched,
        history_size = config.history_size,
        "Configuration loaded"
    );

    let provider = Arc::new(MotDataProvider::open(&cli.data).await?);
    let frames: Vec<u64> = provider.available_keys().into_iter().collect();
    anyhow::ensure!(
        !frames.is_empty(),
        "no frames found in {}",
        cli.data.display()
    );

    let predictor = Arc::new(DynamicDataPredictor::default());
    let cache = DynamicPrefetchCache::builder(Arc::clone(&provider), predictor)
        .config(config)
        .on_event(|event| debug!(?event, "cache event"))
        .build();

    info!(pattern = ?cli.pattern, ops = cli.ops, "Replaying access pattern");

    let n = frames.len();
    let mut cursor = 0usize;
    let started = Instant::now();

    for i in 0..cli.ops {
        let idx = match cli.pattern {
            AccessPattern::Sequential => i % n,
            AccessPattern::Random => (i * 17) % n,
            AccessPattern::Jumps => {
                if i % 5 == 0 {
                    (i * 15) % n
                } else {
                    (cursor + 1) % n
                }
            }
            AccessPattern::Mixed => {
                if i % 3 == 0 {
                    (i * 7) % n
                } else {
                    i % n
                }
            }
        };
        cursor = idx;
        cache.get(frames[idx]).await?;
    }

    let elapsed = started.elapsed();
    let stats = cache.stats();

    info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate_pct = stats.hit_rate() * 100.0,
        prefetch_issued = stats.prefetch_issued,
        prefetch_completed = stats.prefetch_completed,
        prefetch_cancelled = stats.prefetch_cancelled,
        prefetch_errors = stats.prefetch_errors,
        evictions = stats.evictions,
        "Replay complete"
    );
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        ops_per_sec = (cli.ops as f64 / elapsed.as_secs_f64()) as u64,
        "Timing"
    );
    info!(provider_stats = ?provider.stats(), "Provider");

    cache.close().await;

    Ok(())
}
