//! Persisted key naming.
//!
//! Decision flags and the saved URL are scoped by cache key. The path id is
//! scoped by a digest of the original URL so every cache key that targets the
//! same URL shares one continuation token.

use sha2::{Digest, Sha256};

pub const CLIENT_IDENTITY_KEY: &str = "clientIdentity";

pub fn external_shown_key(cache_key: &str) -> String {
    format!("hasShownExternal_{cache_key}")
}

pub fn app_shown_key(cache_key: &str) -> String {
    format!("hasShownApp_{cache_key}")
}

pub fn saved_url_key(cache_key: &str) -> String {
    format!("savedUrl_{cache_key}")
}

pub fn saved_path_id_key(original_url: &str) -> String {
    format!("savedPathId_{}", url_digest(original_url))
}

/// Stable short digest of a URL: first 16 hex chars of its SHA-256.
pub fn url_digest(url: &str) -> String {
    let hex = format!("{:x}", Sha256::digest(url.as_bytes()));
    hex[..16].to_string()
}
