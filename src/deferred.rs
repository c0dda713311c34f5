//! Buffer for not-yet-committed writes.
//!
//! Deferred entries are keyed by logical address, not physical key:
//! derivation is deliberately postponed to commit time so a delete
//! issued between buffering and commit is honored. The buffer is
//! consulted by reads (pending writes win over the backend) and purged
//! by deletes before commit ever runs.

use std::collections::{BTreeSet, HashMap};

use crate::item::CacheItem;
use crate::key::path::LogicalAddress;

/// Per-pool-instance map of pending writes. Not shared across pools.
#[derive(Debug, Default)]
pub struct DeferredBuffer {
    entries: HashMap<LogicalAddress, CacheItem>,
}

impl DeferredBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer an item, replacing any pending write for the same address.
    pub fn put(&mut self, address: LogicalAddress, item: CacheItem) {
        self.entries.insert(address, item);
    }

    pub fn get(&self, address: &LogicalAddress) -> Option<&CacheItem> {
        self.entries.get(address)
    }

    /// Drop the pending write for one exact address, if any.
    pub fn remove(&mut self, address: &LogicalAddress) -> Option<CacheItem> {
        self.entries.remove(address)
    }

    /// Drop every pending hierarchical write at or below `prefix` within
    /// the given tag-scope. The empty prefix matches every hierarchical
    /// entry of the scope; flat entries are never touched. Returns how
    /// many entries were purged.
    pub fn purge_subtree(&mut self, prefix: &[String], scope: &BTreeSet<String>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|address, _| !address.descends_from(prefix, scope));
        before - self.entries.len()
    }

    /// Take all pending entries, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<(LogicalAddress, CacheItem)> {
        self.entries.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
