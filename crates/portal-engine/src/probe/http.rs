use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portal_core::errors::ProbeError;
use portal_core::traits::{HttpTransport, TransportResponse};
use reqwest::redirect::{Attempt, Policy};
use url::Url;

/// `reqwest`-backed transport. A client is built per request so the
/// redirect hook can record into a slot owned by that request alone.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    max_redirects: usize,
    use_system_proxy: bool,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ReqwestTransport {
    pub fn new(max_redirects: usize) -> Self {
        Self {
            max_redirects,
            use_system_proxy: true,
        }
    }

    pub fn use_system_proxy(mut self, enabled: bool) -> Self {
        self.use_system_proxy = enabled;
        self
    }

    fn client(
        &self,
        timeout: Duration,
        first_hop: Arc<Mutex<Option<String>>>,
    ) -> reqwest::Result<reqwest::Client> {
        let max = self.max_redirects;
        let policy = Policy::custom(move |attempt: Attempt<'_>| {
            if attempt.previous().len() > max {
                return attempt.error("too many redirects");
            }
            if let Ok(mut slot) = first_hop.lock() {
                if slot.is_none() {
                    *slot = Some(attempt.url().to_string());
                }
            }
            attempt.follow()
        });

        let mut builder = reqwest::Client::builder().redirect(policy).timeout(timeout);
        if !self.use_system_proxy {
            builder = builder.no_proxy();
        }
        builder.build()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, ProbeError> {
        let first_hop = Arc::new(Mutex::new(None));
        let client = self
            .client(timeout, Arc::clone(&first_hop))
            .map_err(|e| ProbeError::Network(error_chain(&e)))?;

        tracing::debug!(url = %url, ?timeout, "probe GET");
        let response = client.get(url.clone()).send().await.map_err(|e| {
            if e.is_builder() {
                ProbeError::InvalidUrl(url.to_string())
            } else {
                ProbeError::Network(error_chain(&e))
            }
        })?;
        let status = response.status().as_u16();
        response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Network(error_chain(&e))
            } else {
                ProbeError::MalformedResponse(error_chain(&e))
            }
        })?;

        let redirect_target = first_hop.lock().ok().and_then(|slot| slot.clone());
        Ok(TransportResponse {
            status,
            redirect_target,
        })
    }
}

/// `reqwest` errors keep the useful detail in their source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
