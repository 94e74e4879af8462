//! Local filenames for cached images

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Longest encoded URL prefix kept in a filename
pub const MAX_ENCODED_LEN: usize = 100;

/// Extension used when the URL does not end in one
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Whether a URL points at the network (`http://` or `https://`)
pub fn is_remote_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Derive the cache filename for a remote URL.
///
/// The URL is encoded with URL-safe, unpadded base64 and cut to
/// [`MAX_ENCODED_LEN`] characters, then suffixed with the extension found at
/// the end of the URL (ignoring any query string). URLs that share their
/// first 75 bytes can therefore map to the same filename.
pub fn url_to_filename(url: &str) -> String {
    let mut encoded = URL_SAFE_NO_PAD.encode(url);
    encoded.truncate(MAX_ENCODED_LEN);
    format!("{}.{}", encoded, extension_of(url))
}

fn extension_of(url: &str) -> &str {
    let without_query = url.split_once('?').map_or(url, |(path, _)| path);

    without_query
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION)
}
