//! Error types for the image cache collaborators

use std::fmt;

#[derive(Debug)]
pub enum ImageCacheError {
    Io(Box<std::io::Error>),
    Http(Box<reqwest::Error>),
    Json(serde_json::Error),
    Storage(String),
}

impl fmt::Display for ImageCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageCacheError::Io(err) => write!(f, "IO error: {}", err),
            ImageCacheError::Http(err) => write!(f, "HTTP error: {}", err),
            ImageCacheError::Json(err) => write!(f, "JSON error: {}", err),
            ImageCacheError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for ImageCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageCacheError::Io(err) => Some(err.as_ref()),
            ImageCacheError::Http(err) => Some(err.as_ref()),
            ImageCacheError::Json(err) => Some(err),
            ImageCacheError::Storage(_) => None,
        }
    }
}

impl From<std::io::Error> for ImageCacheError {
    fn from(err: std::io::Error) -> Self {
        ImageCacheError::Io(Box::new(err))
    }
}

impl From<reqwest::Error> for ImageCacheError {
    fn from(err: reqwest::Error) -> Self {
        ImageCacheError::Http(Box::new(err))
    }
}

impl From<serde_json::Error> for ImageCacheError {
    fn from(err: serde_json::Error) -> Self {
        ImageCacheError::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, ImageCacheError>;
