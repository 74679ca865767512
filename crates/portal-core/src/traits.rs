use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::{ProbeError, StoreError};
use crate::types::DeviceClass;

/// Supplies the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Classifies the device the gate is deciding for.
pub trait DeviceOracle: Send + Sync {
    fn device_class(&self) -> DeviceClass;
}

/// Answers whether network connectivity is currently usable.
#[async_trait]
pub trait Reachability: Send + Sync {
    /// Must return within `timeout`, reporting `false` if it could not tell.
    async fn is_reachable(&self, timeout: Duration) -> bool;
}

/// Raw outcome of a single GET with redirects followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Status of the final response in the redirect chain.
    pub status: u16,
    /// Destination of the first redirect hop, if any redirect happened.
    pub redirect_target: Option<String>,
}

/// Issues one GET request, following redirects natively.
///
/// Status acceptance is not the transport's concern; see `ACCEPTED_STATUS`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &url::Url, timeout: Duration)
        -> Result<TransportResponse, ProbeError>;
}

/// Durable key-value storage for cached decisions.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Apply all entries as one commit.
    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), StoreError>;

    fn remove_many(&self, keys: &[String]) -> Result<(), StoreError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_many(vec![(key.to_string(), value)])
    }

    /// Missing or non-boolean values read as `false`.
    fn get_bool(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty()))
    }
}
