//! Facade behavior: deferred buffering, commit accounting, clear.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use hiercache::{
    BackendError, CacheBackend, CacheItem, HierarchicalCachePool, MemoryBackend,
};

fn pool() -> HierarchicalCachePool<MemoryBackend> {
    HierarchicalCachePool::new(MemoryBackend::new())
}

#[tokio::test]
async fn test_commit_writes_deferred_entries() {
    let pool = pool();

    pool.save_deferred(CacheItem::new("|a|one", "1")).await.unwrap();
    pool.save_deferred(CacheItem::new("|a|two", "2")).await.unwrap();

    let report = pool.commit().await;
    assert!(report.is_ok());
    assert_eq!(report.committed.len(), 2);

    assert!(pool.has_item("|a|one", &[]).await.unwrap());
    assert!(pool.has_item("|a|two", &[]).await.unwrap());

    // Nothing left to commit.
    let report = pool.commit().await;
    assert!(report.is_ok());
    assert!(report.committed.is_empty());
}

#[tokio::test]
async fn test_delete_purges_deferred_before_commit() {
    let pool = pool();

    pool.save_deferred(CacheItem::new("|aaa|bbb", "value"))
        .await
        .unwrap();

    pool.delete_item("|", &[]).await.unwrap();
    assert!(
        !pool.has_item("|aaa|bbb", &[]).await.unwrap(),
        "deferred hierarchy items should be removed"
    );

    // Commit runs after the delete and must not resurrect the entry.
    let report = pool.commit().await;
    assert!(report.is_ok());
    assert!(report.committed.is_empty());
    assert!(!pool.has_item("|aaa|bbb", &[]).await.unwrap());
}

#[tokio::test]
async fn test_ancestor_delete_purges_deferred_descendants() {
    let pool = pool();

    pool.save_deferred(CacheItem::new("|p|q|r", "deep")).await.unwrap();
    pool.save_deferred(CacheItem::new("|p|other", "sibling"))
        .await
        .unwrap();

    pool.delete_item("|p|q", &[]).await.unwrap();
    let report = pool.commit().await;

    assert!(report.is_ok());
    assert_eq!(report.committed, vec!["|p|other".to_string()]);
    assert!(!pool.has_item("|p|q|r", &[]).await.unwrap());
    assert!(pool.has_item("|p|other", &[]).await.unwrap());
}

#[tokio::test]
async fn test_deferred_purge_respects_tag_scope() {
    let pool = pool();

    pool.save_deferred(CacheItem::new("|p|q", "tagged").with_tags(["t"]))
        .await
        .unwrap();

    // Untagged delete of the same path must not purge the tagged entry.
    pool.delete_item("|p", &[]).await.unwrap();
    let report = pool.commit().await;

    assert_eq!(report.committed, vec!["|p|q".to_string()]);
    assert!(pool.has_item("|p|q", &["t"]).await.unwrap());
}

#[tokio::test]
async fn test_flat_delete_purges_exact_deferred_entry_only() {
    let pool = pool();

    pool.save_deferred(CacheItem::new("foo", "flat")).await.unwrap();
    pool.save_deferred(CacheItem::new("foobar", "other")).await.unwrap();

    pool.delete_item("foo", &[]).await.unwrap();
    let report = pool.commit().await;

    assert_eq!(report.committed, vec!["foobar".to_string()]);
    assert!(!pool.has_item("foo", &[]).await.unwrap());
    assert!(pool.has_item("foobar", &[]).await.unwrap());
}

#[tokio::test]
async fn test_clear_wipes_everything_including_flat_keys() {
    let pool = pool();

    pool.save(CacheItem::new("flat", "v")).await.unwrap();
    pool.save(CacheItem::new("|hier|item", "v")).await.unwrap();
    pool.save_deferred(CacheItem::new("|pending", "v")).await.unwrap();

    pool.clear().await.unwrap();

    assert!(!pool.has_item("flat", &[]).await.unwrap());
    assert!(!pool.has_item("|hier|item", &[]).await.unwrap());
    assert!(!pool.has_item("|pending", &[]).await.unwrap());
    assert!(pool.commit().await.committed.is_empty());
}

#[tokio::test]
async fn test_ttl_forwarded_to_backend() {
    let pool = pool();

    pool.save(CacheItem::new("|ttl|gone", "v").expires_after(Duration::ZERO))
        .await
        .unwrap();
    pool.save(CacheItem::new("|ttl|kept", "v").expires_after(Duration::from_secs(3600)))
        .await
        .unwrap();

    assert!(!pool.has_item("|ttl|gone", &[]).await.unwrap());
    assert!(pool.has_item("|ttl|kept", &[]).await.unwrap());
}

/// Backend that fails writes of a marker payload while the switch is on.
/// Everything else passes through to the in-memory store.
struct FlakyBackend {
    inner: MemoryBackend,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl CacheBackend for FlakyBackend {
    async fn read(&self, key: &str) -> Result<Option<Bytes>, BackendError> {
        self.inner.read(key).await
    }

    async fn write(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        if self.failing.load(Ordering::Relaxed) && value.as_ref() == b"poison" {
            return Err(BackendError::Unavailable("injected write failure".into()));
        }
        self.inner.write(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.inner.delete(key).await
    }

    async fn increment(&self, key: &str) -> Result<u64, BackendError> {
        self.inner.increment(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Bytes,
    ) -> Result<bool, BackendError> {
        self.inner.compare_and_swap(key, expected, new).await
    }

    async fn clear_all(&self) -> Result<(), BackendError> {
        self.inner.clear_all().await
    }
}

#[tokio::test]
async fn test_commit_partial_failure_keeps_failed_entries() {
    let failing = Arc::new(AtomicBool::new(true));
    let pool = HierarchicalCachePool::new(FlakyBackend {
        inner: MemoryBackend::new(),
        failing: failing.clone(),
    });

    pool.save_deferred(CacheItem::new("|ok", "fine")).await.unwrap();
    pool.save_deferred(CacheItem::new("|bad", "poison")).await.unwrap();

    let report = pool.commit().await;
    assert!(!report.is_ok());
    assert_eq!(report.committed, vec!["|ok".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "|bad");

    // The successful write landed despite the failure.
    assert!(pool.has_item("|ok", &[]).await.unwrap());

    // Retrying commits exactly the failures: the already-written entry
    // is neither dropped nor written again.
    failing.store(false, Ordering::Relaxed);
    let report = pool.commit().await;
    assert!(report.is_ok());
    assert_eq!(report.committed, vec!["|bad".to_string()]);
    assert!(pool.has_item("|bad", &[]).await.unwrap());
}
