//! Cache types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How long a downloaded image stays valid: 21 days, in milliseconds
pub const CACHE_TTL_MS: i64 = 21 * 24 * 60 * 60 * 1000;

/// Storage key under which the whole metadata map is persisted
pub const METADATA_KEY: &str = "@image_cache_metadata";

/// Name of the cache subdirectory holding downloaded images
pub const CACHE_DIR_NAME: &str = "image_cache";

/// Metadata for a cached image, keyed by its remote URL in [`CacheMetadata`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub local_path: String,
    pub cached_at: i64,
    pub expires_at: i64,
}

impl CacheEntry {
    /// Create an entry for a file downloaded at `cached_at` (epoch ms)
    pub fn new(local_path: impl Into<String>, cached_at: i64) -> Self {
        Self {
            local_path: local_path.into(),
            cached_at,
            expires_at: cached_at + CACHE_TTL_MS,
        }
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }
}

/// Remote URL -> cache entry. Always read and written as a whole.
pub type CacheMetadata = HashMap<String, CacheEntry>;

/// Outcome of downloading a remote file to a local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub status: u16,
    pub uri: String,
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Filesystem information about a path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub exists: bool,
    pub size: Option<u64>,
}

impl FileInfo {
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Current epoch time in milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_is_twenty_one_days() {
        assert_eq!(CACHE_TTL_MS, 1_814_400_000);
    }

    #[test]
    fn test_cache_entry_expires_after_ttl() {
        let entry = CacheEntry::new("/cache/abc.jpg", 1_000);
        assert_eq!(entry.expires_at - entry.cached_at, CACHE_TTL_MS);
        assert!(entry.is_valid_at(1_000));
        assert!(entry.is_valid_at(entry.expires_at - 1));
        assert!(!entry.is_valid_at(entry.expires_at));
    }

    #[test]
    fn test_cache_entry_serialization() {
        let entry = CacheEntry::new("/cache/abc.jpg", 1_700_000_000_000);

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"localPath\":\"/cache/abc.jpg\""));
        assert!(json.contains("\"cachedAt\":1700000000000"));
        assert!(json.contains("\"expiresAt\":"));

        let deserialized: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, entry);
    }

    #[test]
    fn test_metadata_deserializes_from_persisted_layout() {
        let json = r#"{
            "https://cdn.example.com/a.jpg": {
                "localPath": "/data/image_cache/aHR0cHM.jpg",
                "cachedAt": 100,
                "expiresAt": 200
            }
        }"#;

        let metadata: CacheMetadata = serde_json::from_str(json).unwrap();
        let entry = &metadata["https://cdn.example.com/a.jpg"];
        assert_eq!(entry.local_path, "/data/image_cache/aHR0cHM.jpg");
        assert_eq!(entry.cached_at, 100);
        assert_eq!(entry.expires_at, 200);
    }

    #[test]
    fn test_download_result_success_is_200_only() {
        let ok = DownloadResult {
            status: 200,
            uri: "/tmp/a.jpg".to_string(),
        };
        let not_found = DownloadResult {
            status: 404,
            uri: "/tmp/a.jpg".to_string(),
        };
        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
