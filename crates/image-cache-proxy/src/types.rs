//! Core types for the image cache proxy

use image_uri_cache::CacheStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the proxy
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    /// Holds the `image_cache/` and `storage/` directories
    pub cache_root: PathBuf,
    pub sweep_on_start: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cache_root: PathBuf::from("./cache"),
            sweep_on_start: true,
        }
    }
}

/// `?url=` query parameter
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UriResponse {
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreloadRequest {
    #[serde(default)]
    pub urls: Vec<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct PreloadResponse {
    pub requested: usize,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub removed: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}
