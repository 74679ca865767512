//! Redirect-resolving HTTP probe and connectivity check.
//!
//! A probe is one GET against a URL. It succeeds when the final status lies
//! in [`ACCEPTED_STATUS`], and resolves to the destination of the *first*
//! redirect hop (or the requested URL when no redirect happened). Later hops
//! are followed but not captured.

pub mod http;
pub mod reachability;

use std::time::Duration;

use portal_core::errors::ProbeError;
use portal_core::query::parse_url;
use portal_core::traits::HttpTransport;
use portal_core::types::{is_accepted_status, ACCEPTED_STATUS};

/// An accepted probe response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub status: u16,
    pub url: String,
}

pub async fn resolve(
    transport: &dyn HttpTransport,
    url: &str,
    timeout: Duration,
) -> Result<Resolved, ProbeError> {
    let parsed = parse_url(url)?;
    let response = transport.get(&parsed, timeout).await?;
    if !is_accepted_status(response.status) {
        tracing::debug!(url, status = response.status, accepted = ?ACCEPTED_STATUS, "probe rejected");
        return Err(ProbeError::RejectedStatus(response.status));
    }
    let resolved = response.redirect_target.unwrap_or_else(|| url.to_string());
    tracing::debug!(url, status = response.status, resolved = %resolved, "probe accepted");
    Ok(Resolved {
        status: response.status,
        url: resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use portal_core::traits::TransportResponse;

    struct Fixed(u16, Option<&'static str>);

    #[async_trait]
    impl HttpTransport for Fixed {
        async fn get(
            &self,
            _url: &url::Url,
            _timeout: Duration,
        ) -> Result<TransportResponse, ProbeError> {
            Ok(TransportResponse {
                status: self.0,
                redirect_target: self.1.map(str::to_string),
            })
        }
    }

    const T: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn band_boundaries() {
        for status in [200, 403] {
            let r = resolve(&Fixed(status, None), "https://example.com/x", T).await.unwrap();
            assert_eq!(r.status, status);
        }
        for status in [404, 500] {
            assert_eq!(
                resolve(&Fixed(status, None), "https://example.com/x", T).await,
                Err(ProbeError::RejectedStatus(status))
            );
        }
    }

    #[tokio::test]
    async fn falls_back_to_requested_url() {
        let r = resolve(&Fixed(200, None), "https://example.com/x", T).await.unwrap();
        assert_eq!(r.url, "https://example.com/x");

        let r = resolve(&Fixed(200, Some("https://example.com/y?pathid=42")), "https://example.com/x", T)
            .await
            .unwrap();
        assert_eq!(r.url, "https://example.com/y?pathid=42");
    }

    #[tokio::test]
    async fn unparsable_url_never_reaches_transport() {
        let err = resolve(&Fixed(200, None), "not a url", T).await.unwrap_err();
        assert_eq!(err, ProbeError::InvalidUrl("not a url".into()));
    }
}
