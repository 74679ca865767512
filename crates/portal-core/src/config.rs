use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::DeviceClass;

pub const DEFAULT_CONFIG_PATH: &str = ".portal/config.json";

/// Gate wiring read from `.portal/config.json`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub store_path: String,
    /// `None` disables the decision journal.
    pub journal_path: Option<String>,
    pub reachability_endpoints: Vec<String>,
    pub reachability_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub max_redirects: usize,
    pub use_system_proxy: bool,
    pub device_class: DeviceClass,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            store_path: ".portal/decisions.json".to_string(),
            journal_path: Some(".portal/decisions.jsonl".to_string()),
            reachability_endpoints: vec!["1.1.1.1:443".to_string(), "8.8.8.8:443".to_string()],
            reachability_timeout_ms: 2000,
            request_timeout_secs: 10,
            max_redirects: 10,
            use_system_proxy: true,
            device_class: DeviceClass::Unknown,
        }
    }
}

impl GateConfig {
    pub fn reachability_timeout(&self) -> Duration {
        Duration::from_millis(self.reachability_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("cannot read config {path}"))?;
        serde_json::from_str(&content).with_context(|| format!("{path}: invalid config JSON"))
    }

    /// Load an explicit config file, or the default one if it exists.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"device_class": "tablet", "max_redirects": 3}"#).unwrap();

        let cfg = GateConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.device_class, DeviceClass::Tablet);
        assert_eq!(cfg.max_redirects, 3);
        assert_eq!(cfg.reachability_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.store_path, ".portal/decisions.json");
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(GateConfig::load(path.to_str()).is_err());
    }

    #[test]
    fn null_journal_disables_it() {
        let cfg: GateConfig = serde_json::from_str(r#"{"journal_path": null}"#).unwrap();
        assert_eq!(cfg.journal_path, None);
    }
}
