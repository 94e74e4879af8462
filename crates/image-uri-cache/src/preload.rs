//! Warming the cache ahead of need

use crate::cache::ImageCache;
use crate::filename::is_remote_url;
use futures::future::join_all;
use tracing::debug;

/// Most lookups a preload keeps in flight at once
pub const PRELOAD_BATCH_SIZE: usize = 5;

impl ImageCache {
    /// Populate the cache for every remote URL in `urls`.
    ///
    /// Non-remote and missing URLs are skipped. URLs are processed in
    /// batches of [`PRELOAD_BATCH_SIZE`]; each batch runs concurrently and
    /// finishes before the next starts.
    pub async fn preload_images<S: AsRef<str>>(&self, urls: &[Option<S>]) {
        let remote: Vec<&str> = urls
            .iter()
            .filter_map(|url| url.as_ref().map(S::as_ref))
            .filter(|url| is_remote_url(url))
            .collect();

        if remote.is_empty() {
            return;
        }

        debug!(count = remote.len(), "Preloading images");

        for batch in remote.chunks(PRELOAD_BATCH_SIZE) {
            join_all(batch.iter().map(|url| self.get_cached_image_uri(Some(*url)))).await;
        }
    }
}
