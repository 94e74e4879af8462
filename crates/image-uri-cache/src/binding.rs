//! Reactive bindings for rendering cached images
//!
//! [`CachedImageHandle`] tracks the resolution of one image URL and
//! publishes its state on a watch channel. [`CachedImage`] turns an
//! [`ImageSource`] into what a renderer should draw.

use crate::cache::ImageCache;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::error;

/// Opaque handle to an image bundled with the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(pub u32);

/// Where an image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Bundled with the app; never goes through the cache
    LocalAsset(AssetId),
    /// A URL resolved through the cache
    RemoteUrl(String),
}

impl From<AssetId> for ImageSource {
    fn from(id: AssetId) -> Self {
        ImageSource::LocalAsset(id)
    }
}

impl From<String> for ImageSource {
    fn from(url: String) -> Self {
        ImageSource::RemoteUrl(url)
    }
}

/// Resolution state of a cached image URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedImageState {
    pub cached_uri: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl CachedImageState {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }
}

/// Tracks the cached URI for a URL that may change over time.
///
/// Each URL change starts a new lookup on the Tokio runtime. Results of
/// lookups for a previous URL, or that finish after the handle and all its
/// subscribers are dropped, are discarded. Lookups themselves are never
/// cancelled.
pub struct CachedImageHandle {
    cache: ImageCache,
    url: Option<String>,
    generation: Arc<AtomicU64>,
    state_tx: Arc<watch::Sender<CachedImageState>>,
    state_rx: watch::Receiver<CachedImageState>,
}

impl CachedImageHandle {
    /// Start resolving `url`. Must be called within a Tokio runtime.
    pub fn new(cache: ImageCache, url: Option<String>) -> Self {
        let (state_tx, state_rx) = watch::channel(CachedImageState::default());
        let handle = Self {
            cache,
            url,
            generation: Arc::new(AtomicU64::new(0)),
            state_tx: Arc::new(state_tx),
            state_rx,
        };
        handle.resolve();
        handle
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Switch to a new URL. Setting the current URL again does nothing.
    pub fn set_url(&mut self, url: Option<String>) {
        if self.url == url {
            return;
        }
        self.url = url;
        self.resolve();
    }

    pub fn state(&self) -> CachedImageState {
        self.state_rx.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<CachedImageState> {
        self.state_tx.subscribe()
    }

    /// Wait for the current lookup to finish
    pub async fn resolved(&mut self) -> CachedImageState {
        if let Ok(state) = self.state_rx.wait_for(|state| !state.loading).await {
            return state.clone();
        }
        self.state()
    }

    fn resolve(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(url) = self.url.clone() else {
            self.state_tx.send_replace(CachedImageState::default());
            return;
        };
        self.state_tx.send_replace(CachedImageState::loading());

        let cache = self.cache.clone();
        let state_tx = self.state_tx.clone();
        let current = self.generation.clone();

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(cache.get_cached_image_uri(Some(url.as_str())))
                .catch_unwind()
                .await;

            if state_tx.is_closed() {
                return;
            }

            let state = match outcome {
                Ok(cached_uri) => CachedImageState {
                    cached_uri,
                    loading: false,
                    error: None,
                },
                Err(_) => {
                    error!(url = %url, "Image cache lookup panicked");
                    CachedImageState {
                        cached_uri: None,
                        loading: false,
                        error: Some("image cache lookup failed".to_string()),
                    }
                }
            };

            // Checked under the channel lock so a newer URL always wins
            state_tx.send_if_modified(|published| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *published = state;
                true
            });
        });
    }
}

/// What to draw for an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageView {
    /// Lookup still running
    Placeholder,
    Asset(AssetId),
    Uri(String),
    /// Nothing to draw
    Empty,
}

/// Renders an optional [`ImageSource`], resolving remote URLs through the
/// cache
pub struct CachedImage {
    source: Option<ImageSource>,
    handle: Option<CachedImageHandle>,
}

impl CachedImage {
    /// Must be called within a Tokio runtime when `source` is remote
    pub fn new(cache: &ImageCache, source: Option<ImageSource>) -> Self {
        let handle = match &source {
            Some(ImageSource::RemoteUrl(url)) => {
                Some(CachedImageHandle::new(cache.clone(), Some(url.clone())))
            }
            _ => None,
        };
        Self { source, handle }
    }

    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_ref()
    }

    pub fn view(&self) -> ImageView {
        match (&self.source, &self.handle) {
            (Some(ImageSource::LocalAsset(id)), _) => ImageView::Asset(*id),
            (Some(ImageSource::RemoteUrl(_)), Some(handle)) => Self::view_of(&handle.state()),
            _ => ImageView::Empty,
        }
    }

    /// Wait until there is something final to draw
    pub async fn ready(&mut self) -> ImageView {
        if let Some(handle) = self.handle.as_mut() {
            handle.resolved().await;
        }
        self.view()
    }

    fn view_of(state: &CachedImageState) -> ImageView {
        if state.loading {
            return ImageView::Placeholder;
        }
        match &state.cached_uri {
            Some(uri) => ImageView::Uri(uri.clone()),
            None => ImageView::Empty,
        }
    }
}
