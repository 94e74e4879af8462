//! Removal of expired cache entries

use crate::cache::ImageCache;
use crate::types::{now_millis, CacheMetadata};
use std::path::Path;
use tracing::{debug, info, warn};

impl ImageCache {
    /// Delete every expired image and drop its entry from the index.
    ///
    /// Returns how many entries were removed. The index is only rewritten
    /// when something expired. Deleting a file that is already gone is fine,
    /// and the entry is dropped even when deleting its file fails.
    pub async fn clean_expired_cache(&self) -> usize {
        let now = now_millis();
        let metadata = self.metadata.load().await;
        let total = metadata.len();

        let (valid, expired): (CacheMetadata, CacheMetadata) = metadata
            .into_iter()
            .partition(|(_, entry)| entry.is_valid_at(now));

        if expired.is_empty() {
            debug!(entries = total, "No expired images in cache");
            return 0;
        }

        for (url, entry) in &expired {
            if let Err(e) = self.fs.delete(Path::new(&entry.local_path), true).await {
                warn!(url = %url, path = %entry.local_path, error = %e, "Failed to delete expired image");
            }
        }

        self.metadata.save(&valid).await;

        info!(
            removed = expired.len(),
            remaining = valid.len(),
            "Cleaned expired images from cache"
        );
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};
    use crate::testing::MockFileSystem;
    use crate::types::{CacheEntry, CACHE_TTL_MS, METADATA_KEY};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Memory store that counts writes
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryKeyValueStore,
        sets: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    fn expired_entry(path: &str) -> CacheEntry {
        CacheEntry::new(path, now_millis() - CACHE_TTL_MS - 1_000)
    }

    async fn setup(
        entries: Vec<(&str, CacheEntry)>,
    ) -> (ImageCache, Arc<MockFileSystem>, Arc<CountingStore>) {
        let fs = Arc::new(MockFileSystem::new());
        let store = Arc::new(CountingStore::default());

        let mut metadata = CacheMetadata::new();
        for (url, entry) in entries {
            fs.put_file(&entry.local_path, 100);
            metadata.insert(url.to_string(), entry);
        }
        store
            .inner
            .set(METADATA_KEY, &serde_json::to_string(&metadata).unwrap())
            .await
            .unwrap();

        let cache = ImageCache::new("/data/image_cache", store.clone(), fs.clone());
        (cache, fs, store)
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_entries() {
        let (cache, fs, _) = setup(vec![
            ("https://a.example/old.jpg", expired_entry("/data/image_cache/old.jpg")),
            (
                "https://a.example/new.jpg",
                CacheEntry::new("/data/image_cache/new.jpg", now_millis()),
            ),
        ])
        .await;
        let started = now_millis();

        let removed = cache.clean_expired_cache().await;

        assert_eq!(removed, 1);
        assert!(!fs.has_file("/data/image_cache/old.jpg"));
        assert!(fs.has_file("/data/image_cache/new.jpg"));

        let metadata = cache.metadata().load().await;
        assert_eq!(metadata.len(), 1);
        assert!(metadata.values().all(|e| e.expires_at > started));
    }

    #[tokio::test]
    async fn test_sweep_without_expired_entries_does_not_write() {
        let (cache, _, store) = setup(vec![(
            "https://a.example/new.jpg",
            CacheEntry::new("/data/image_cache/new.jpg", now_millis()),
        )])
        .await;

        assert_eq!(cache.clean_expired_cache().await, 0);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sweep_on_empty_cache() {
        let (cache, _, store) = setup(vec![]).await;

        assert_eq!(cache.clean_expired_cache().await, 0);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sweep_tolerates_missing_files() {
        let (cache, fs, _) = setup(vec![(
            "https://a.example/old.jpg",
            expired_entry("/data/image_cache/old.jpg"),
        )])
        .await;
        fs.remove_file("/data/image_cache/old.jpg");

        assert_eq!(cache.clean_expired_cache().await, 1);
        assert!(cache.metadata().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_drops_entries_when_delete_fails() {
        let (cache, fs, store) = setup(vec![
            ("https://a.example/1.jpg", expired_entry("/data/image_cache/1.jpg")),
            ("https://a.example/2.jpg", expired_entry("/data/image_cache/2.jpg")),
        ])
        .await;
        fs.fail_deletes();

        assert_eq!(cache.clean_expired_cache().await, 2);
        assert!(cache.metadata().load().await.is_empty());
        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
    }
}
