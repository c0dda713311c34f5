//! Generation stamps: one version counter per (path-prefix, tag-scope) node.
//!
//! Generations are persisted in the backend itself, created lazily at 0
//! on first read and advanced on delete. Every derived physical key
//! folds in the generations of all its ancestor nodes, so a single bump
//! makes an entire subtree unreachable without ever enumerating it.
//!
//! Bumps go through the backend's native atomic increment when it has
//! one; otherwise a bounded compare-and-swap loop guards against lost
//! updates from concurrent deleters.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::backend::{BackendError, CacheBackend};
use crate::error::CacheError;

const INITIAL_GENERATION: u64 = 0;

fn parse_generation(bytes: &[u8]) -> u64 {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(INITIAL_GENERATION)
}

/// Reads and advances generation records in the backend.
pub struct GenerationStore<B> {
    backend: Arc<B>,
    cas_max_retries: u32,
}

impl<B: CacheBackend> GenerationStore<B> {
    pub fn new(backend: Arc<B>, cas_max_retries: u32) -> Self {
        Self {
            backend,
            cas_max_retries,
        }
    }

    /// Current generation of a node, persisting the initial value on
    /// first access so concurrent readers converge on the same stamp.
    pub async fn get(&self, node_key: &str) -> Result<u64, CacheError> {
        match self.backend.read(node_key).await? {
            Some(bytes) => Ok(parse_generation(&bytes)),
            None => {
                self.backend
                    .write(
                        node_key,
                        Bytes::from(INITIAL_GENERATION.to_string()),
                        None,
                    )
                    .await?;
                Ok(INITIAL_GENERATION)
            }
        }
    }

    /// Advance a node's generation, invalidating every key derived
    /// through it. Returns the new stamp.
    pub async fn bump(&self, node_key: &str) -> Result<u64, CacheError> {
        match self.backend.increment(node_key).await {
            Ok(generation) => {
                debug!(node = node_key, generation, "bumped generation");
                Ok(generation)
            }
            Err(BackendError::Unsupported(_)) => self.bump_via_cas(node_key).await,
            Err(err) => Err(err.into()),
        }
    }

    /// Compare-and-swap fallback for backends without a native counter.
    /// Retries a bounded number of times, then reports the conflict as a
    /// backend failure.
    async fn bump_via_cas(&self, node_key: &str) -> Result<u64, CacheError> {
        for attempt in 0..self.cas_max_retries {
            let current = self.backend.read(node_key).await?;
            let next = current
                .as_deref()
                .map(parse_generation)
                .unwrap_or(INITIAL_GENERATION)
                + 1;
            let swapped = self
                .backend
                .compare_and_swap(node_key, current.as_deref(), Bytes::from(next.to_string()))
                .await?;
            if swapped {
                debug!(node = node_key, generation = next, "bumped generation via CAS");
                return Ok(next);
            }
            debug!(node = node_key, attempt, "generation CAS lost the race");
        }
        Err(CacheError::Backend(BackendError::Conflict(
            node_key.to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    use std::time::Duration;

    use async_trait::async_trait;

    #[tokio::test]
    async fn test_get_defaults_and_persists_zero() {
        let backend = Arc::new(MemoryBackend::new());
        let store = GenerationStore::new(backend.clone(), 3);

        assert_eq!(store.get("node").await.unwrap(), 0);
        // The default was persisted, not just returned.
        assert_eq!(backend.read("node").await.unwrap().unwrap().as_ref(), b"0");
    }

    #[tokio::test]
    async fn test_bump_uses_native_increment() {
        let backend = Arc::new(MemoryBackend::new());
        let store = GenerationStore::new(backend, 3);

        assert_eq!(store.get("node").await.unwrap(), 0);
        assert_eq!(store.bump("node").await.unwrap(), 1);
        assert_eq!(store.bump("node").await.unwrap(), 2);
        assert_eq!(store.get("node").await.unwrap(), 2);
    }

    /// Backend with no native increment: bumps must go through CAS.
    struct CasOnly(MemoryBackend);

    #[async_trait]
    impl CacheBackend for CasOnly {
        async fn read(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
            self.0.read(key).await
        }
        async fn write(
            &self,
            key: &str,
            value: Bytes,
            ttl: Option<Duration>,
        ) -> Result<(), BackendError> {
            self.0.write(key, value, ttl).await
        }
        async fn delete(&self, key: &str) -> Result<(), BackendError> {
            self.0.delete(key).await
        }
        async fn compare_and_swap(
            &self,
            key: &str,
            expected: Option<&[u8]>,
            new: Bytes,
        ) -> Result<bool, BackendError> {
            self.0.compare_and_swap(key, expected, new).await
        }
        async fn clear_all(&self) -> Result<(), BackendError> {
            self.0.clear_all().await
        }
    }

    #[tokio::test]
    async fn test_bump_falls_back_to_cas() {
        let backend = Arc::new(CasOnly(MemoryBackend::new()));
        let store = GenerationStore::new(backend, 3);

        assert_eq!(store.bump("node").await.unwrap(), 1);
        assert_eq!(store.bump("node").await.unwrap(), 2);
    }

    /// Backend whose CAS always loses, to exercise retry exhaustion.
    struct AlwaysConflict(MemoryBackend);

    #[async_trait]
    impl CacheBackend for AlwaysConflict {
        async fn read(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
            self.0.read(key).await
        }
        async fn write(
            &self,
            key: &str,
            value: Bytes,
            ttl: Option<Duration>,
        ) -> Result<(), BackendError> {
            self.0.write(key, value, ttl).await
        }
        async fn delete(&self, key: &str) -> Result<(), BackendError> {
            self.0.delete(key).await
        }
        async fn compare_and_swap(
            &self,
            _key: &str,
            _expected: Option<&[u8]>,
            _new: Bytes,
        ) -> Result<bool, BackendError> {
            Ok(false)
        }
        async fn clear_all(&self) -> Result<(), BackendError> {
            self.0.clear_all().await
        }
    }

    #[tokio::test]
    async fn test_cas_exhaustion_is_a_backend_error() {
        let backend = Arc::new(AlwaysConflict(MemoryBackend::new()));
        let store = GenerationStore::new(backend, 3);

        let err = store.bump("node").await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::Backend(BackendError::Conflict(_))
        ));
    }
}
