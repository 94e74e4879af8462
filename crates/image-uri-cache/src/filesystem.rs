//! Filesystem and download access for cached images

use crate::error::Result;
use crate::types::{DownloadResult, FileInfo};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

/// Filesystem operations the cache relies on
#[async_trait]
pub trait CacheFileSystem: Send + Sync {
    /// Look up whether `path` exists and how large it is
    async fn get_info(&self, path: &Path) -> Result<FileInfo>;

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.get_info(path).await?.exists)
    }

    /// Create `path` and any missing parents. Existing directories are fine.
    async fn make_directory(&self, path: &Path) -> Result<()>;

    /// Download `url` to `dest`, reporting the HTTP status.
    ///
    /// A non-success status is returned as a value, not an error. Transport
    /// failures are errors.
    async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult>;

    /// Delete a file or a directory tree. With `idempotent`, a missing path
    /// is not an error.
    async fn delete(&self, path: &Path, idempotent: bool) -> Result<()>;
}

/// [`CacheFileSystem`] backed by the local disk and an HTTP client
pub struct LocalFileSystem {
    client: Client,
    download_seq: AtomicU64,
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            download_seq: AtomicU64::new(0),
        }
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheFileSystem for LocalFileSystem {
    async fn get_info(&self, path: &Path) -> Result<FileInfo> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(FileInfo {
                exists: true,
                size: meta.is_file().then(|| meta.len()),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileInfo::missing()),
            Err(e) => Err(e.into()),
        }
    }

    async fn make_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult> {
        debug!(url = %url, dest = ?dest, "Downloading image");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let uri = dest.to_string_lossy().to_string();

        // Only a 200 counts as cached; anything else must not leave a file
        if status != StatusCode::OK {
            warn!(status = %status, url = %url, "Image download returned non-OK status");
            return Ok(DownloadResult {
                status: status.as_u16(),
                uri,
            });
        }

        let data = response.bytes().await?;

        // Each write gets its own temp file beside the target, so concurrent
        // downloads of one URL never share or truncate each other's data
        let seq = self.download_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = dest.with_extension(format!("{}.download", seq));
        if let Err(e) = fs::write(&tmp, &data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, dest).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(url = %url, size = data.len(), "Downloaded image");

        Ok(DownloadResult {
            status: status.as_u16(),
            uri,
        })
    }

    async fn delete(&self, path: &Path, idempotent: bool) -> Result<()> {
        let result = match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
            Ok(_) => fs::remove_file(path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if idempotent && e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
