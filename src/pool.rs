//! The cache pool facade.
//!
//! Orchestrates parsing, key derivation, the deferred buffer, and the
//! backend into the get/has/save/delete/commit/clear surface. The pool
//! itself persists nothing: "deleted" is an emergent property, since
//! after a generation bump the old physical keys simply can no longer
//! be derived.
//!
//! # Consistency
//!
//! There is no cross-process linearizability. A save whose key
//! derivation interleaves with a concurrent delete's generation bump
//! may write under the pre-bump key and resurrect a just-invalidated
//! address until the next delete. This staleness window is an accepted
//! trade-off; callers that need strict ordering must serialize
//! externally. The pool performs no retries beyond the bounded CAS loop
//! inside generation bumps.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::CacheBackend;
use crate::config::PoolConfig;
use crate::deferred::DeferredBuffer;
use crate::error::CacheError;
use crate::generation::GenerationStore;
use crate::item::CacheItem;
use crate::key::encoder::KeyEncoder;
use crate::key::path::LogicalAddress;

/// Per-entry outcome of a [`HierarchicalCachePool::commit`].
///
/// Entries that failed stay buffered, so a retried commit writes exactly
/// the failures: nothing is dropped and nothing is written twice.
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Raw keys written through successfully.
    pub committed: Vec<String>,
    /// Raw keys that failed, with the error each one hit.
    pub failed: Vec<(String, CacheError)>,
}

impl CommitReport {
    /// Whether every pending entry was written.
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A cache pool with O(depth) subtree invalidation over a flat backend.
///
/// One [`DeferredBuffer`] per instance; instances sharing a backend see
/// each other's committed writes and deletes but not each other's
/// deferred entries.
pub struct HierarchicalCachePool<B: CacheBackend> {
    backend: Arc<B>,
    encoder: KeyEncoder<B>,
    deferred: Mutex<DeferredBuffer>,
    config: PoolConfig,
}

impl<B: CacheBackend> HierarchicalCachePool<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, PoolConfig::default())
    }

    pub fn with_config(backend: B, config: PoolConfig) -> Self {
        let backend = Arc::new(backend);
        let encoder = KeyEncoder::new(GenerationStore::new(
            backend.clone(),
            config.cas_max_retries,
        ));
        Self {
            backend,
            encoder,
            deferred: Mutex::new(DeferredBuffer::new()),
            config,
        }
    }

    fn address(&self, key: &str, tags: &[&str]) -> Result<LogicalAddress, CacheError> {
        LogicalAddress::parse(key, tags.iter().copied())
    }

    /// Fetch an item. Pending deferred writes win over the backend; a
    /// miss is `None`, never an error, not even for an address nothing
    /// was ever stored under.
    pub async fn get_item(
        &self,
        key: &str,
        tags: &[&str],
    ) -> Result<Option<CacheItem>, CacheError> {
        let address = self.address(key, tags)?;

        let pending = self.deferred.lock().await.get(&address).cloned();
        if pending.is_some() {
            return Ok(pending);
        }

        let derived = self.encoder.derive(&address).await?;
        match self.backend.read(derived.physical.as_str()).await? {
            Some(value) => Ok(Some(CacheItem::from_backend(key, address.tags(), value))),
            None => Ok(None),
        }
    }

    /// Whether an item is present, deferred writes included.
    pub async fn has_item(&self, key: &str, tags: &[&str]) -> Result<bool, CacheError> {
        Ok(self.get_item(key, tags).await?.is_some())
    }

    /// Write an item through immediately, dropping any now-superseded
    /// deferred entry for the same address.
    pub async fn save(&self, item: CacheItem) -> Result<(), CacheError> {
        let address = self.item_address(&item)?;
        self.write_through(&address, &item).await?;
        self.deferred.lock().await.remove(&address);
        Ok(())
    }

    /// Buffer an item for a later [`commit`]. Key derivation is
    /// deliberately postponed to commit time, so a delete issued in
    /// between wins.
    ///
    /// [`commit`]: HierarchicalCachePool::commit
    pub async fn save_deferred(&self, item: CacheItem) -> Result<(), CacheError> {
        let address = self.item_address(&item)?;
        self.deferred.lock().await.put(address, item);
        Ok(())
    }

    /// Invalidate an address and, for hierarchical keys, every
    /// descendant sharing its tag-scope in O(depth), by bumping one
    /// generation. Pending deferred writes under the deleted prefix are
    /// purged synchronously. Idempotent.
    pub async fn delete_item(&self, key: &str, tags: &[&str]) -> Result<bool, CacheError> {
        let address = self.address(key, tags)?;

        // Purge pending writes first so a racing commit cannot
        // resurrect them.
        {
            let mut deferred = self.deferred.lock().await;
            let purged = if address.is_hierarchical() {
                deferred.purge_subtree(address.segments(), address.tags())
            } else {
                usize::from(deferred.remove(&address).is_some())
            };
            if purged > 0 {
                debug!(key, purged, "purged deferred entries");
            }
        }

        if address.is_hierarchical() {
            // Derive with the pre-bump generations so the stale physical
            // slot can be reclaimed; the bump is what actually
            // invalidates the subtree.
            let derived = self.encoder.derive(&address).await?;
            if let Some(node) = derived.leaf_node.as_deref() {
                self.encoder.generations().bump(node).await?;
            }
            self.backend.delete(derived.physical.as_str()).await?;
            debug!(key, "invalidated subtree");
        } else {
            // Flat keys are tag-partitioned as well: delete exactly the
            // physical slot for this tag set.
            let derived = self.encoder.derive(&address).await?;
            self.backend.delete(derived.physical.as_str()).await?;
            debug!(key, "deleted flat key");
        }

        Ok(true)
    }

    /// Write every remaining deferred entry through, deriving keys with
    /// the generations current *now*. Failed entries stay buffered and
    /// are reported per key; committed entries are not written again on
    /// a retried commit.
    pub async fn commit(&self) -> CommitReport {
        let entries = self.deferred.lock().await.drain();
        let mut report = CommitReport::default();

        for (address, item) in entries {
            match self.write_through(&address, &item).await {
                Ok(()) => report.committed.push(item.key().to_string()),
                Err(err) => {
                    warn!(key = item.key(), error = %err, "deferred write failed");
                    let key = item.key().to_string();
                    self.deferred.lock().await.put(address, item);
                    report.failed.push((key, err));
                }
            }
        }

        if !report.committed.is_empty() || !report.failed.is_empty() {
            info!(
                committed = report.committed.len(),
                failed = report.failed.len(),
                "commit finished"
            );
        }
        report
    }

    /// Wipe the entire backend namespace, flat keys and generation
    /// records included. Strictly broader than deleting the hierarchy
    /// root, which leaves flat keys untouched.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.deferred.lock().await.clear();
        self.backend.clear_all().await?;
        info!("cleared backend namespace");
        Ok(())
    }

    fn item_address(&self, item: &CacheItem) -> Result<LogicalAddress, CacheError> {
        LogicalAddress::parse(item.key(), item.tags().iter().map(String::as_str))
    }

    async fn write_through(
        &self,
        address: &LogicalAddress,
        item: &CacheItem,
    ) -> Result<(), CacheError> {
        let derived = self.encoder.derive(address).await?;
        let ttl = item.ttl().or_else(|| self.config.default_ttl());
        self.backend
            .write(derived.physical.as_str(), item.value().clone(), ttl)
            .await?;
        debug!(key = item.key(), physical = %derived.physical, "wrote item");
        Ok(())
    }
}
