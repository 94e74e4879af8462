//! Resolves remote image URLs to locally cached files

use crate::error::Result;
use crate::filename::{is_remote_url, url_to_filename};
use crate::filesystem::{CacheFileSystem, LocalFileSystem};
use crate::metadata::MetadataStore;
use crate::storage::{FileKeyValueStore, KeyValueStore};
use crate::types::{now_millis, CacheEntry, CacheStats, CACHE_DIR_NAME};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Disk-backed image cache with a persisted URL index.
///
/// Cloning is cheap; clones share the same directory, metadata store and
/// counters.
#[derive(Clone)]
pub struct ImageCache {
    /// Directory where downloaded images are stored
    cache_dir: PathBuf,
    /// Persisted URL -> entry index
    pub(crate) metadata: MetadataStore,
    pub(crate) fs: Arc<dyn CacheFileSystem>,
    /// Cache hit counter
    hits: Arc<AtomicU64>,
    /// Cache miss counter
    misses: Arc<AtomicU64>,
}

impl ImageCache {
    /// Create a cache storing images in `cache_dir`
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        store: Arc<dyn KeyValueStore>,
        fs: Arc<dyn CacheFileSystem>,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            metadata: MetadataStore::new(store),
            fs,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a cache on the local disk: images under `root/image_cache`,
    /// metadata under `root/storage`
    pub fn with_local_storage(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(
            root.join(CACHE_DIR_NAME),
            Arc::new(FileKeyValueStore::new(root.join("storage"))),
            Arc::new(LocalFileSystem::new()),
        )
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Make sure the cache directory exists. Safe to call repeatedly.
    pub async fn ensure_cache_directory(&self) -> Result<()> {
        if !self.fs.exists(&self.cache_dir).await? {
            self.fs.make_directory(&self.cache_dir).await?;
            debug!(cache_dir = ?self.cache_dir, "Created image cache directory");
        }
        Ok(())
    }

    /// Resolve an image URL to something renderable.
    ///
    /// `None` stays `None`. Anything that is not `http(s)://` is returned
    /// unchanged. Remote URLs resolve to a cached local path, downloading
    /// when needed; on any failure the remote URL itself is returned.
    pub async fn get_cached_image_uri(&self, image_url: Option<&str>) -> Option<String> {
        let image_url = image_url?;

        if !is_remote_url(image_url) {
            return Some(image_url.to_string());
        }

        match self.resolve_remote(image_url).await {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!(url = %image_url, error = %e, "Image cache lookup failed, using remote URL");
                Some(image_url.to_string())
            }
        }
    }

    async fn resolve_remote(&self, image_url: &str) -> Result<String> {
        self.ensure_cache_directory().await?;

        let mut metadata = self.metadata.load().await;

        if let Some(entry) = metadata.get(image_url) {
            if entry.is_valid_at(now_millis()) {
                if self.fs.exists(Path::new(&entry.local_path)).await? {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(url = %image_url, path = %entry.local_path, "Image cache hit");
                    return Ok(entry.local_path.clone());
                }

                debug!(url = %image_url, path = %entry.local_path, "Cached image file missing, re-downloading");
                metadata.remove(image_url);
                self.metadata.save(&metadata).await;
            } else {
                debug!(url = %image_url, "Cached image expired");
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        let local_path = self.cache_dir.join(url_to_filename(image_url));
        let result = self.fs.download(image_url, &local_path).await?;

        if !result.is_success() {
            warn!(url = %image_url, status = result.status, "Image download failed, using remote URL");
            return Ok(image_url.to_string());
        }

        metadata.insert(
            image_url.to_string(),
            CacheEntry::new(result.uri.clone(), now_millis()),
        );
        self.metadata.save(&metadata).await;

        debug!(url = %image_url, path = %result.uri, "Cached image");
        Ok(result.uri)
    }

    /// Delete every cached image and the persisted index
    pub async fn clear_image_cache(&self) {
        if let Err(e) = self.fs.delete(&self.cache_dir, true).await {
            warn!(cache_dir = ?self.cache_dir, error = %e, "Failed to delete image cache directory");
        }
        if let Err(e) = self.metadata.clear().await {
            warn!(error = %e, "Failed to remove image cache metadata");
        }

        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        info!(cache_dir = ?self.cache_dir, "Image cache cleared");
    }

    /// Get current cache statistics
    pub async fn get_cache_stats(&self) -> CacheStats {
        let metadata = self.metadata.load().await;

        let mut total_size = 0;
        for (url, entry) in &metadata {
            match self.fs.get_info(Path::new(&entry.local_path)).await {
                Ok(info) if info.exists => total_size += info.size.unwrap_or(0),
                Ok(_) => {}
                Err(e) => debug!(url = %url, error = %e, "Failed to stat cached image"),
            }
        }

        CacheStats {
            entries: metadata.len(),
            total_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
