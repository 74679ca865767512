//! Revalidation of a cached external URL and path-id re-resolution.

use std::time::Duration;

use portal_core::errors::ProbeError;
use portal_core::query::{append_param, merge_param, path_id_of, PATH_ID_PARAM, PUSH_ID_PARAM};
use portal_core::traits::HttpTransport;

use crate::probe::resolve;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    /// Resolved URL when valid, otherwise the URL that was probed.
    pub final_url: String,
}

/// Re-probe a saved URL with the client identity appended as `push_id`.
pub async fn validate_saved_url(
    transport: &dyn HttpTransport,
    saved_url: &str,
    client_id: &str,
    timeout: Duration,
) -> Validation {
    let probed = match append_param(saved_url, PUSH_ID_PARAM, client_id) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(saved_url, error = %e, "saved URL cannot be revalidated");
            return Validation {
                valid: false,
                final_url: saved_url.to_string(),
            };
        }
    };

    match resolve(transport, &probed, timeout).await {
        Ok(resolved) => Validation {
            valid: true,
            final_url: resolved.url,
        },
        Err(e) => {
            tracing::info!(url = %probed, error = %e, "saved URL no longer valid");
            Validation {
                valid: false,
                final_url: probed,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refreshed {
    pub url: String,
    /// `pathid` carried by the resolved URL, if any.
    pub path_id: Option<String>,
}

/// Re-probe the original URL, resuming the server-side route via `pathid`.
pub async fn resolve_with_path_id(
    transport: &dyn HttpTransport,
    original_url: &str,
    path_id: Option<&str>,
    timeout: Duration,
) -> Result<Refreshed, ProbeError> {
    let target = match path_id {
        Some(id) => merge_param(original_url, PATH_ID_PARAM, id)?,
        None => {
            tracing::debug!(original_url, "no path id stored, retrying bare URL");
            original_url.to_string()
        }
    };

    let resolved = resolve(transport, &target, timeout).await?;
    let path_id = path_id_of(&resolved.url);
    Ok(Refreshed {
        url: resolved.url,
        path_id,
    })
}
