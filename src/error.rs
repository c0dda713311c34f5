//! Error types for the cache pool surface.
//!
//! "Key not found" is never an error anywhere in this crate; misses are
//! `None`/`false` results. Errors are reserved for malformed keys and
//! backend failures.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced by the pool facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The raw key or one of its tags is malformed (reserved encoding
    /// character, empty tag). Rejected before any backend call.
    #[error("invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// An I/O failure from the flat store, surfaced unchanged. Also the
    /// terminal report for a generation bump whose bounded CAS retry
    /// loop was exhausted.
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),
}

impl CacheError {
    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
