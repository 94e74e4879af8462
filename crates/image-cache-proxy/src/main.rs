//! Image cache proxy
//!
//! Serves the disk-backed image cache over HTTP so web and webview clients
//! can resolve, preload and sweep cached images.

mod error;
mod server;
mod types;

use crate::error::{ProxyError, Result};
use crate::server::{start_server, ServerState, SharedState};
use crate::types::ProxyConfig;
use image_uri_cache::ImageCache;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("image_cache_proxy=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting image cache proxy...");

    let config = load_config()?;
    info!("Port: {}", config.port);
    info!("Cache root: {:?}", config.cache_root);

    let cache = ImageCache::with_local_storage(&config.cache_root);
    cache
        .ensure_cache_directory()
        .await
        .map_err(|e| ProxyError::Config(format!("Cannot create cache directory: {}", e)))?;

    if config.sweep_on_start {
        let removed = cache.clean_expired_cache().await;
        info!(removed, "Start-up sweep finished");
    }

    let state: SharedState = Arc::new(ServerState::new(cache));

    start_server(state, config.port).await?;

    Ok(())
}

fn load_config() -> Result<ProxyConfig> {
    let defaults = ProxyConfig::default();

    let port = match std::env::var("PORT") {
        Ok(raw) => raw
            .parse::<u16>()
            .map_err(|_| ProxyError::Config(format!("invalid PORT: {}", raw)))?,
        Err(_) => defaults.port,
    };

    let cache_root = std::env::var("CACHE_ROOT")
        .map(PathBuf::from)
        .unwrap_or(defaults.cache_root);

    let sweep_on_start = std::env::var("SWEEP_ON_START")
        .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
        .unwrap_or(defaults.sweep_on_start);

    Ok(ProxyConfig {
        port,
        cache_root,
        sweep_on_start,
    })
}
