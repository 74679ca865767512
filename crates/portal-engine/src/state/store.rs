use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use portal_core::errors::StoreError;
use portal_core::traits::KeyValueStore;
use serde_json::{Map, Value};

use super::atomic::{atomic_write, AdvisoryLock};

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Process-local store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, batch: Vec<(String, Value)>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.extend(batch);
        Ok(())
    }

    fn remove_many(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

/// JSON-object file on disk. Every commit re-reads the file under an
/// advisory lock and replaces it atomically, so concurrent processes
/// never observe a half-written store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    local: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            local: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn commit<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _local = self.local.lock().map_err(|_| StoreError::Poisoned)?;
        let _lock = AdvisoryLock::acquire_with_retry(&self.path, LOCK_ATTEMPTS, LOCK_RETRY_DELAY)
            .map_err(|e| StoreError::Locked(format!("{e:#}")))?;

        let mut map = self.read_map()?;
        mutate(&mut map);
        let json = serde_json::to_string_pretty(&map)?;
        atomic_write(&self.path, json.as_bytes()).map_err(|e| StoreError::Backend(format!("{e:#}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _local = self.local.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_many(&self, batch: Vec<(String, Value)>) -> Result<(), StoreError> {
        self.commit(|map| {
            for (k, v) in batch {
                map.insert(k, v);
            }
        })
    }

    fn remove_many(&self, keys: &[String]) -> Result<(), StoreError> {
        self.commit(|map| {
            for key in keys {
                map.remove(key);
            }
        })
    }
}
