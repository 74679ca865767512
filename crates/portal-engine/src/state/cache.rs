use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use portal_core::errors::StoreError;
use portal_core::keys;
use portal_core::state::{DecisionRecord, PendingWrites};
use portal_core::traits::KeyValueStore;
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;

/// Typed view of decision records over a key-value store, plus a
/// per-cache-key lock that serializes gate calls sharing a key.
pub struct DecisionCache {
    store: Arc<dyn KeyValueStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DecisionCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Wait for exclusive use of `cache_key`. Held until the guard drops.
    pub async fn lock(&self, cache_key: &str) -> Result<OwnedMutexGuard<()>, StoreError> {
        let slot = {
            let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
            // Only the map itself references idle slots.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(locks.entry(cache_key.to_string()).or_default())
        };
        Ok(slot.lock_owned().await)
    }

    pub fn load(&self, cache_key: &str, original_url: &str) -> Result<DecisionRecord, StoreError> {
        Ok(DecisionRecord {
            external_shown: self.store.get_bool(&keys::external_shown_key(cache_key))?,
            app_shown: self.store.get_bool(&keys::app_shown_key(cache_key))?,
            saved_url: self.store.get_string(&keys::saved_url_key(cache_key))?,
            saved_path_id: self.saved_path_id(original_url)?,
        })
    }

    pub fn saved_path_id(&self, original_url: &str) -> Result<Option<String>, StoreError> {
        self.store.get_string(&keys::saved_path_id_key(original_url))
    }

    /// Flush one call's writes as a single store commit.
    ///
    /// Runs on the blocking pool: file-backed stores sleep while another
    /// writer holds the advisory lock.
    pub async fn commit(
        &self,
        cache_key: &str,
        original_url: &str,
        writes: PendingWrites,
    ) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut batch = Vec::new();
        if let Some(v) = writes.external_shown {
            batch.push((keys::external_shown_key(cache_key), Value::Bool(v)));
        }
        if let Some(v) = writes.app_shown {
            batch.push((keys::app_shown_key(cache_key), Value::Bool(v)));
        }
        if let Some(url) = writes.saved_url {
            batch.push((keys::saved_url_key(cache_key), Value::String(url)));
        }
        if let Some(id) = writes.saved_path_id {
            batch.push((keys::saved_path_id_key(original_url), Value::String(id)));
        }

        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.set_many(batch))
            .await
            .map_err(|e| StoreError::Backend(format!("store commit task failed: {e}")))?
    }

    /// Forget the decision for `cache_key` and the path id for `original_url`.
    pub fn clear(&self, cache_key: &str, original_url: &str) -> Result<(), StoreError> {
        self.store.remove_many(&[
            keys::external_shown_key(cache_key),
            keys::app_shown_key(cache_key),
            keys::saved_url_key(cache_key),
            keys::saved_path_id_key(original_url),
        ])
    }
}
