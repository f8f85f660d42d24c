// Key-value persistence backends

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Byte store addressed by a key
///
/// Values are opaque bytes: the backend never interprets them, so a value
/// that is not valid UTF-8 or JSON still loads and is left to the caller to
/// reject. The todo store reads one key at startup and rewrites it after
/// every mutation.
pub trait KvStore: Send {
    /// Raw value under `key`, or `None` if nothing was ever written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value under `key`
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<K: KvStore + ?Sized> KvStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Check a key is usable by every backend (it doubles as a file name)
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-process map; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `value` already stored under `key`
    pub fn with_entry(key: &str, value: impl AsRef<[u8]>) -> Self {
        let kv = Self::new();
        kv.lock_entries().insert(key.to_string(), value.as_ref().to_vec());
        kv
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.lock_entries().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.lock_entries().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.lock_entries().remove(key);
        Ok(())
    }
}

// ============================================================================
// File backend
// ============================================================================

/// One `<key>.json` file per key inside a directory
///
/// Access goes through a sibling `<key>.lock` file: shared for reads,
/// exclusive for writes. Writes land in `<key>.json.tmp`, are synced, then
/// renamed over the value file, so a crash mid-write leaves the previous
/// value intact.
#[derive(Debug, Clone)]
pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Open or create the directory backing this store
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(path = ?base_path, "Opened file store");
        Ok(Self { base_path })
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    fn lock_file(&self, key: &str) -> Result<File> {
        let path = self.base_path.join(format!("{}.lock", key));
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.value_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let lock = self.lock_file(key)?;
        lock.lock_shared().context("Failed to acquire shared file lock")?;

        let mut content = Vec::new();
        File::open(&path)
            .and_then(|mut file| file.read_to_end(&mut content))
            .with_context(|| format!("Failed to read {}", path.display()))?;

        // Lock is released when `lock` is dropped
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.value_path(key)?;
        let tmp_path = self.base_path.join(format!("{}.json.tmp", key));

        let lock = self.lock_file(key)?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let mut tmp = File::create(&tmp_path).context("Failed to create temporary value file")?;
        tmp.write_all(value)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!(key, bytes = value.len(), "Wrote value file");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.value_path(key)?;
        if path.exists() {
            let lock = self.lock_file(key)?;
            lock.lock_exclusive().context("Failed to acquire file lock")?;
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}
