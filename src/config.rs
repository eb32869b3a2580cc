//! Runtime configuration for dynamic-prefetch-cache.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically. All cache sizing knobs (resident cap, prefetch cap,
//! history depth) live here.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command-line arguments for the demo binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dynamic-prefetch-cache",
    about = "Replay an access pattern over a MOT data file through the prefetching cache"
)]
pub struct Cli {
    /// Path to the MOT tracking-data file.
    #[arg(short, long)]
    pub data: PathBuf,

    /// Access pattern to replay.
    #[arg(short, long, value_enum, default_value_t = AccessPattern::Sequential)]
    pub pattern: AccessPattern,

    /// Number of lookups to perform.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub ops: usize,

    /// Optional cache configuration file (JSON).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Synthetic access patterns for the demo binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccessPattern {
    /// Walk the frames in order, wrapping around.
    Sequential,
    /// Pseudo-random strides across the whole file.
    Random,
    /// Mostly sequential with periodic long jumps.
    Jumps,
    /// Alternating sequential and strided access.
    Mixed,
}

/// Cache sizing and lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of resident entries. Must be at least 1.
    pub max_keys_cached: usize,

    /// Maximum number of concurrent speculative loads. 0 disables
    /// speculation entirely.
    pub max_keys_prefetched: usize,

    /// Number of recent accesses retained for the predictor.
    pub history_size: usize,

    /// How long `close` waits for the background worker to stop.
    pub shutdown_grace_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_keys_cached: 64,
            max_keys_prefetched: 8,
            history_size: 30,
            shutdown_grace_secs: 5,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a JSON file, falling back to defaults if
    /// the file does not exist.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: CacheConfig = serde_json::from_str(&data)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(CacheConfig::default())
        }
    }

    /// Check invariants that the cache core relies on.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_keys_cached == 0 {
            anyhow::bail!("max_keys_cached must be at least 1");
        }
        Ok(())
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.max_keys_cached, 64);
        assert_eq!(cfg.history_size, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_resident_cap_rejected() {
        let cfg = CacheConfig {
            max_keys_cached: 0,
            ..CacheConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_prefetch_cap_is_valid() {
        let cfg = CacheConfig {
            max_keys_prefetched: 0,
            ..CacheConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
