//! In-process reference backend.
//!
//! A `HashMap` behind a `tokio::sync::RwLock`, with lazy expiry checks.
//! This is the backend the test suites and benches run against; it also
//! documents the semantics a production backend (Redis, Memcached, ...)
//! must provide.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::backend::{BackendError, CacheBackend};

#[derive(Debug, Clone)]
struct StoredValue {
    data: Bytes,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory [`CacheBackend`] with a native atomic counter.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries. Test observability only.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|v| !v.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn parse_counter(bytes: &[u8]) -> u64 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(value) if !value.is_expired(Instant::now()) => Ok(Some(value.data.clone())),
            _ => Ok(None),
        }
    }

    async fn write(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredValue {
                data: value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<u64, BackendError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let current = entries
            .get(key)
            .filter(|v| !v.is_expired(now))
            .map(|v| parse_counter(&v.data))
            .unwrap_or(0);
        let next = current + 1;
        entries.insert(
            key.to_string(),
            StoredValue {
                data: Bytes::from(next.to_string()),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Bytes,
    ) -> Result<bool, BackendError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let current = entries
            .get(key)
            .filter(|v| !v.is_expired(now))
            .map(|v| v.data.as_ref());
        if current != expected {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            StoredValue {
                data: new,
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn clear_all(&self) -> Result<(), BackendError> {
        let mut entries = self.entries.write().await;
        entries.clear();
        Ok(())
    }
}
