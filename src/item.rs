//! Cache item: the unit the pool stores and returns.

use std::collections::BTreeSet;
use std::time::Duration;

use bytes::Bytes;

/// A payload addressed by a raw key and a tag set, with an optional
/// time-to-live forwarded to the backend on write.
///
/// The crate does not interpret the payload; serialization is the
/// caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    key: String,
    tags: BTreeSet<String>,
    value: Bytes,
    ttl: Option<Duration>,
}

impl CacheItem {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            tags: BTreeSet::new(),
            value: value.into(),
            ttl: None,
        }
    }

    /// Attach tags. The same path under a different tag set is a wholly
    /// distinct item.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Forward a time-to-live to the backend when this item is written.
    pub fn expires_after(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub(crate) fn from_backend(key: &str, tags: &BTreeSet<String>, value: Bytes) -> Self {
        Self {
            key: key.to_string(),
            tags: tags.clone(),
            value,
            ttl: None,
        }
    }
}
