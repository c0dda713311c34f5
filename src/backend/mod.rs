//! The flat key-value backend seam.
//!
//! The pool never talks to storage directly; everything goes through
//! [`CacheBackend`]. The trait models the minimal contract the pool
//! needs: point reads/writes/deletes, an atomic counter primitive (or a
//! compare-and-swap fallback), and a namespace wipe.
//!
//! - [`memory`]: in-process reference backend used by tests and benches

pub mod memory;

pub use memory::MemoryBackend;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors reported by a backend implementation.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The store could not be reached or the operation failed.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend does not implement this optional operation.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// A compare-and-swap lost its race too many times.
    #[error("compare-and-swap conflict on {0}")]
    Conflict(String),
}

/// A flat key-value store the pool layers hierarchy semantics on top of.
///
/// Implementations must be safe to share across tasks. Cancellation and
/// timeout behavior are entirely the backend's concern; the pool adds no
/// retries of its own beyond the bounded CAS loop for generation bumps.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read the value at `key`, or `None` on a miss.
    async fn read(&self, key: &str) -> Result<Option<Bytes>, BackendError>;

    /// Write `value` at `key`, optionally with a time-to-live.
    async fn write(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError>;

    /// Remove exactly one physical key. Deleting an absent key is not an
    /// error.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Atomically increment the integer stored at `key` (treating a
    /// missing key as 0) and return the new value.
    ///
    /// Backends without a native counter keep the default implementation
    /// and the pool falls back to [`compare_and_swap`].
    ///
    /// [`compare_and_swap`]: CacheBackend::compare_and_swap
    async fn increment(&self, _key: &str) -> Result<u64, BackendError> {
        Err(BackendError::Unsupported("atomic increment"))
    }

    /// Write `new` at `key` only if the current value equals `expected`
    /// (`None` = key absent). Returns whether the swap happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Bytes,
    ) -> Result<bool, BackendError>;

    /// Wipe the entire namespace, including keys this crate never wrote.
    async fn clear_all(&self) -> Result<(), BackendError>;
}

/// Shared handles are backends too, so several pools can layer over one
/// store.
#[async_trait]
impl<B: CacheBackend + ?Sized> CacheBackend for std::sync::Arc<B> {
    async fn read(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        (**self).read(key).await
    }

    async fn write(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        (**self).write(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        (**self).delete(key).await
    }

    async fn increment(&self, key: &str) -> Result<u64, BackendError> {
        (**self).increment(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Bytes,
    ) -> Result<bool, BackendError> {
        (**self).compare_and_swap(key, expected, new).await
    }

    async fn clear_all(&self) -> Result<(), BackendError> {
        (**self).clear_all().await
    }
}
