//! Persisted URL -> cache entry index
//!
//! The whole map lives as one JSON blob under a single storage key. Every
//! mutation is a full read-modify-write of that map; there are no partial
//! updates. Two overlapping read-modify-write cycles lose the earlier write.

use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::types::{CacheMetadata, METADATA_KEY};
use std::sync::Arc;
use tracing::warn;

/// Loads and saves [`CacheMetadata`] through a [`KeyValueStore`]
#[derive(Clone)]
pub struct MetadataStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl MetadataStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, METADATA_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Read the persisted map. Missing or unreadable metadata is an empty map.
    pub async fn load(&self) -> CacheMetadata {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheMetadata::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read image cache metadata");
                return CacheMetadata::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to parse image cache metadata");
                CacheMetadata::new()
            }
        }
    }

    /// Overwrite the persisted map. Failures are logged and dropped.
    pub async fn save(&self, metadata: &CacheMetadata) {
        if let Err(e) = self.try_save(metadata).await {
            warn!(key = %self.key, error = %e, "Failed to save image cache metadata");
        }
    }

    async fn try_save(&self, metadata: &CacheMetadata) -> Result<()> {
        let raw = serde_json::to_string(metadata)?;
        self.store.set(&self.key, &raw).await
    }

    /// Drop the persisted map entirely
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(&self.key).await
    }
}
