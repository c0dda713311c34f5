//! Runtime configuration for the cache pool.
//!
//! Configuration can be loaded from a JSON file or constructed
//! programmatically; the defaults work against any backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pool tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// How many times a generation bump retries its compare-and-swap
    /// when the backend has no native atomic increment.
    pub cas_max_retries: u32,

    /// Default time-to-live in seconds applied to items that don't set
    /// one. `None` = no expiry (left to the backend's policy).
    pub default_ttl_secs: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            cas_max_retries: 3,
            default_ttl_secs: None,
        }
    }
}

impl PoolConfig {
    /// Load configuration from a JSON file, falling back to defaults if
    /// the file does not exist.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: PoolConfig = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(PoolConfig::default())
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }
}
