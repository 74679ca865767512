use std::time::Duration;

use async_trait::async_trait;
use portal_core::traits::Reachability;
use tokio::net::TcpStream;
use tokio::task::JoinSet;

/// Connectivity check by TCP connect: reachable as soon as any endpoint accepts.
#[derive(Debug, Clone)]
pub struct TcpReachability {
    endpoints: Vec<String>,
}

impl TcpReachability {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl Reachability for TcpReachability {
    async fn is_reachable(&self, timeout: Duration) -> bool {
        if self.endpoints.is_empty() {
            return false;
        }
        let mut attempts = JoinSet::new();
        for endpoint in &self.endpoints {
            let endpoint = endpoint.clone();
            attempts.spawn(async move { TcpStream::connect(endpoint.as_str()).await.is_ok() });
        }

        let first_success = async {
            while let Some(joined) = attempts.join_next().await {
                if matches!(joined, Ok(true)) {
                    return true;
                }
            }
            false
        };
        // Dropping the set aborts connects still in flight.
        let reachable = tokio::time::timeout(timeout, first_success)
            .await
            .unwrap_or(false);
        tracing::debug!(reachable, endpoints = ?self.endpoints, "reachability probe");
        reachable
    }
}
