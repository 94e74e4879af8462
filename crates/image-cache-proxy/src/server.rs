//! HTTP server for image cache endpoints
//!
//! Provides /health, /uri, /image, /preload, /sweep, /stats and /cache.

use crate::types::{
    HealthResponse, PreloadRequest, PreloadResponse, SweepResponse, UriResponse, UrlQuery,
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use image_uri_cache::{is_remote_url, CacheStats, ImageCache};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: ImageCache,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: ImageCache) -> Self {
        Self {
            cache,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/uri", get(get_uri))
        .route("/image", get(get_image))
        .route("/preload", post(preload))
        .route("/sweep", post(sweep))
        .route("/stats", get(stats))
        .route("/cache", delete(clear_cache))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.cache.get_cache_stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

/// Resolve a URL to its cached URI
async fn get_uri(
    State(state): State<SharedState>,
    Query(query): Query<UrlQuery>,
) -> Json<UriResponse> {
    let uri = state.cache.get_cached_image_uri(query.url.as_deref()).await;
    Json(UriResponse { uri })
}

/// Serve a cached image, redirecting to the remote URL when it could not be
/// cached. Only remote URLs are served; local paths are never read.
async fn get_image(State(state): State<SharedState>, Query(query): Query<UrlQuery>) -> Response {
    let Some(url) = query.url.filter(|url| is_remote_url(url)) else {
        return not_found();
    };

    let Some(uri) = state.cache.get_cached_image_uri(Some(url.as_str())).await else {
        return not_found();
    };

    if uri == url {
        return Redirect::temporary(&url).into_response();
    }

    match tokio::fs::read(&uri).await {
        Ok(data) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type_for(&uri))
            .header(header::CACHE_CONTROL, "public, max-age=86400")
            .body(Body::from(data))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            warn!(url = %url, path = %uri, error = %e, "Failed to read cached image");
            Redirect::temporary(&url).into_response()
        }
    }
}

async fn preload(
    State(state): State<SharedState>,
    Json(request): Json<PreloadRequest>,
) -> Json<PreloadResponse> {
    state.cache.preload_images(&request.urls).await;
    Json(PreloadResponse {
        requested: request.urls.len(),
    })
}

async fn sweep(State(state): State<SharedState>) -> Json<SweepResponse> {
    let removed = state.cache.clean_expired_cache().await;
    Json(SweepResponse { removed })
}

async fn stats(State(state): State<SharedState>) -> Json<CacheStats> {
    Json(state.cache.get_cache_stats().await)
}

async fn clear_cache(State(state): State<SharedState>) -> StatusCode {
    state.cache.clear_image_cache().await;
    StatusCode::NO_CONTENT
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Image not found".to_string(),
        }),
    )
        .into_response()
}

fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
