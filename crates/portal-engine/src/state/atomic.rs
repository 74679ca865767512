use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::Rng;

/// Locks older than this are considered abandoned by a crashed writer.
const STALE_LOCK_SECS: i64 = 60;

/// Write content atomically: write to temp file, fsync, rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create directory {}", dir.display()))?;
    let temp_path = dir.join(format!(".{:016x}.tmp", rand::thread_rng().gen::<u64>()));

    let mut file = std::fs::File::create(&temp_path)
        .with_context(|| format!("cannot create temp file for {}", path.display()))?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("cannot rename temp to {}", path.display()))?;
    Ok(())
}

/// Advisory lock on a store file, held as a sibling `.lock` file
/// containing the owner PID and acquisition timestamp.
#[derive(Debug)]
pub struct AdvisoryLock {
    lock_path: PathBuf,
}

impl AdvisoryLock {
    /// Acquire the lock once. Fails if a live lock is held.
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() && is_stale(&lock_path) {
            let _ = std::fs::remove_file(&lock_path);
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .with_context(|| format!("store is locked (lock: {})", lock_path.display()))?;
        let pid = std::process::id();
        let ts = chrono::Utc::now().timestamp();
        write!(file, "{pid}\n{ts}\n")
            .with_context(|| format!("cannot write lock {}", lock_path.display()))?;

        Ok(Self { lock_path })
    }

    /// Acquire the lock, retrying while another writer holds it.
    pub fn acquire_with_retry(path: &Path, attempts: u32, delay: Duration) -> Result<Self> {
        for _ in 1..attempts {
            if let Ok(lock) = Self::acquire(path) {
                return Ok(lock);
            }
            std::thread::sleep(delay);
        }
        match Self::acquire(path) {
            Ok(lock) => Ok(lock),
            Err(e) => bail!("gave up after {attempts} attempts: {e:#}"),
        }
    }

    pub fn release(self) -> Result<()> {
        if self.lock_path.exists() {
            std::fs::remove_file(&self.lock_path)
                .with_context(|| format!("cannot release lock {}", self.lock_path.display()))?;
        }
        Ok(())
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

/// Judge by the recorded timestamp, or by file age when the owner died
/// before writing one.
fn is_stale(lock_path: &Path) -> bool {
    let content = std::fs::read_to_string(lock_path).unwrap_or_default();
    if let Some(ts) = content.lines().nth(1).and_then(|ts| ts.trim().parse::<i64>().ok()) {
        return chrono::Utc::now().timestamp() - ts > STALE_LOCK_SECS;
    }
    std::fs::metadata(lock_path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age.as_secs() > STALE_LOCK_SECS.unsigned_abs())
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".lock");
    PathBuf::from(os)
}
