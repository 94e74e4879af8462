//! In-memory filesystem double shared by the crate's tests

use crate::error::{ImageCacheError, Result};
use crate::filesystem::CacheFileSystem;
use crate::types::{DownloadResult, FileInfo};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Records downloads and keeps "files" in memory.
///
/// Downloads into a directory that was never created fail, like they would
/// on a real disk. Each download sleeps for `delay` so concurrent callers
/// overlap and the peak number in flight can be observed.
#[derive(Default)]
pub(crate) struct MockFileSystem {
    files: Mutex<HashMap<PathBuf, u64>>,
    dirs: Mutex<HashSet<PathBuf>>,
    not_found_urls: Mutex<HashSet<String>>,
    unreachable_urls: Mutex<HashSet<String>>,
    downloads: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail_deletes: AtomicBool,
    delay: Duration,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Downloads of `url` answer 404
    pub fn respond_not_found(&self, url: &str) {
        self.not_found_urls.lock().unwrap().insert(url.to_string());
    }

    /// Downloads of `url` fail with a transport error
    pub fn make_unreachable(&self, url: &str) {
        self.unreachable_urls
            .lock()
            .unwrap()
            .insert(url.to_string());
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn put_file(&self, path: impl Into<PathBuf>, size: u64) {
        self.files.lock().unwrap().insert(path.into(), size);
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        self.files.lock().unwrap().remove(path.as_ref());
    }

    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.files.lock().unwrap().contains_key(path.as_ref())
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().unwrap().contains(path.as_ref())
    }

    pub fn dir_count(&self) -> usize {
        self.dirs.lock().unwrap().len()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }

    pub fn downloads_of(&self, url: &str) -> usize {
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .filter(|u| *u == url)
            .count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheFileSystem for MockFileSystem {
    async fn get_info(&self, path: &Path) -> Result<FileInfo> {
        if let Some(size) = self.files.lock().unwrap().get(path) {
            return Ok(FileInfo {
                exists: true,
                size: Some(*size),
            });
        }
        if self.has_dir(path) {
            return Ok(FileInfo {
                exists: true,
                size: None,
            });
        }
        Ok(FileInfo::missing())
    }

    async fn make_directory(&self, path: &Path) -> Result<()> {
        self.dirs.lock().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.downloads.lock().unwrap().push(url.to_string());

        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable_urls.lock().unwrap().contains(url) {
            return Err(std::io::Error::new(ErrorKind::ConnectionRefused, "unreachable").into());
        }

        let uri = dest.to_string_lossy().to_string();
        if self.not_found_urls.lock().unwrap().contains(url) {
            return Ok(DownloadResult { status: 404, uri });
        }

        let parent_exists = dest.parent().map(|p| self.has_dir(p)).unwrap_or(false);
        if !parent_exists {
            return Err(std::io::Error::new(ErrorKind::NotFound, "no such directory").into());
        }

        self.put_file(dest, url.len() as u64);
        Ok(DownloadResult { status: 200, uri })
    }

    async fn delete(&self, path: &Path, idempotent: bool) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(ImageCacheError::Storage("delete refused".to_string()));
        }

        let removed_file = self.files.lock().unwrap().remove(path).is_some();
        let removed_dir = self.dirs.lock().unwrap().remove(path);
        if removed_dir {
            self.files
                .lock()
                .unwrap()
                .retain(|file, _| !file.starts_with(path));
        }

        if removed_file || removed_dir || idempotent {
            Ok(())
        } else {
            Err(std::io::Error::new(ErrorKind::NotFound, "no such file").into())
        }
    }
}
