//! hiercache: hierarchical invalidation over any flat key-value store.
//!
//! Keys form a path hierarchy (`|users|4711|followers|12|likes`);
//! deleting an ancestor path invalidates every descendant item in
//! O(depth), with no enumeration and no tree structure. Each hierarchy node
//! carries a generation stamp persisted in the backend, and every
//! derived physical key folds in the stamps of all its ancestors, so a
//! single atomic bump makes an entire subtree unreachable. Tag sets
//! select orthogonal generation namespaces: the same path under a
//! different tag set is a wholly distinct item, invalidated
//! independently.
//!
//! - [`key`]: raw key parsing and physical key derivation
//! - [`generation`]: per-node version stamps in the backend
//! - [`deferred`]: buffer for not-yet-committed writes
//! - [`pool`]: the get/has/save/delete/commit/clear facade
//! - [`backend`]: the flat key-value seam + in-memory reference impl
//!
//! ```
//! use hiercache::{CacheItem, HierarchicalCachePool, MemoryBackend};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), hiercache::CacheError> {
//! let pool = HierarchicalCachePool::new(MemoryBackend::new());
//!
//! pool.save(CacheItem::new("|users|4711|followers|4|likes", "...")).await?;
//! assert!(pool.has_item("|users|4711|followers|4|likes", &[]).await?);
//!
//! pool.delete_item("|users|4711|followers", &[]).await?;
//! assert!(!pool.has_item("|users|4711|followers|4|likes", &[]).await?);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod deferred;
pub mod error;
pub mod generation;
pub mod item;
pub mod key;
pub mod pool;

pub use backend::{BackendError, CacheBackend, MemoryBackend};
pub use config::PoolConfig;
pub use error::CacheError;
pub use item::CacheItem;
pub use key::encoder::PhysicalKey;
pub use key::path::LogicalAddress;
pub use pool::{CommitReport, HierarchicalCachePool};
