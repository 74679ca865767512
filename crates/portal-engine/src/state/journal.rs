use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use sha2::{Digest, Sha256};

use super::atomic::AdvisoryLock;

const GENESIS: &str = "genesis";

/// Append-only JSONL log of gate decisions.
///
/// Each line carries `prev_hash`, the SHA-256 of the previous line
/// (`genesis` for the first), so truncation or edits break the chain.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    local: Mutex<()>,
}

impl Journal {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            local: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` (a JSON object), returning the hash of the written line.
    pub fn append(&self, entry: &serde_json::Value) -> Result<String> {
        let _local = self
            .local
            .lock()
            .map_err(|_| anyhow!("journal mutex poisoned"))?;
        let _lock = AdvisoryLock::acquire_with_retry(&self.path, 50, Duration::from_millis(20))?;

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("cannot read journal {}", self.path.display()))
            }
        };
        let prev_hash = content
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(line_hash)
            .unwrap_or_else(|| GENESIS.to_string());

        let mut entry = entry.clone();
        let obj = entry
            .as_object_mut()
            .ok_or_else(|| anyhow!("journal entries must be JSON objects"))?;
        obj.insert("prev_hash".into(), serde_json::Value::String(prev_hash));
        obj.insert(
            "ts".into(),
            serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
        );
        let line = serde_json::to_string(&entry)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("cannot open journal {}", self.path.display()))?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        Ok(line_hash(&line))
    }
}

fn line_hash(line: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(line.as_bytes()))
}

/// Verify the hash chain of a journal file, returning the entry count.
pub fn verify_chain(path: &Path) -> Result<u64> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read journal {}", path.display()))?;

    let mut count = 0u64;
    let mut prev_hash = GENESIS.to_string();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("invalid JSON at line {}", i + 1))?;
        let entry_prev = entry
            .get("prev_hash")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(GENESIS);
        if entry_prev != prev_hash {
            bail!(
                "hash chain broken at entry {count}: expected prev_hash '{prev_hash}', got '{entry_prev}'"
            );
        }
        prev_hash = line_hash(line);
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chain_links_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let journal = Journal::open(&path);

        let first = journal.append(&json!({"event_type": "Decision", "n": 1})).unwrap();
        journal.append(&json!({"event_type": "Decision", "n": 2})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        let e0: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        let e1: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(e0["prev_hash"], "genesis");
        assert_eq!(e1["prev_hash"], first.as_str());
        assert!(e1["ts"].is_string());

        assert_eq!(verify_chain(&path).unwrap(), 2);
    }

    #[test]
    fn tampering_breaks_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let journal = Journal::open(&path);
        journal.append(&json!({"reason": "all checks passed"})).unwrap();
        journal.append(&json!({"reason": "cached app content"})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("all checks passed", "edited")).unwrap();

        let err = verify_chain(&path).unwrap_err();
        assert!(err.to_string().contains("hash chain broken at entry 1"));
    }

    #[test]
    fn non_object_entry_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(dir.path().join("j.jsonl"));
        assert!(journal.append(&json!([1, 2])).is_err());
    }
}
