//! Disk-backed image cache with TTL expiration
//!
//! Maps remote image URLs to downloaded local files, keeps a persisted
//! URL index in a key-value store, and falls back to the remote URL
//! whenever caching fails. Entries expire 21 days after download.

mod binding;
mod cache;
pub mod error;
mod filename;
mod filesystem;
mod metadata;
mod preload;
mod storage;
mod sweep;
mod types;

#[cfg(test)]
mod testing;

pub use binding::{AssetId, CachedImage, CachedImageHandle, CachedImageState, ImageSource, ImageView};
pub use cache::ImageCache;
pub use error::{ImageCacheError, Result};
pub use filename::{is_remote_url, url_to_filename, DEFAULT_EXTENSION, MAX_ENCODED_LEN};
pub use filesystem::{CacheFileSystem, LocalFileSystem};
pub use metadata::MetadataStore;
pub use preload::PRELOAD_BATCH_SIZE;
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use types::{
    CacheEntry, CacheMetadata, CacheStats, DownloadResult, FileInfo, CACHE_DIR_NAME, CACHE_TTL_MS,
    METADATA_KEY,
};
