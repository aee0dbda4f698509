//! Persisted skip sets
//!
//! A skip set is a set of item keys the agent should not crawl again, stored
//! on disk as a JSON array of strings. The agent runs up to two of them side
//! by side: the blacklist (packages known not to exist) and the seen set
//! (packages already pushed, in fast mode).

use crate::storage::StorageResult;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Entries {
    keys: HashSet<String>,
    /// Number of keys at the last successful load or save
    persisted: usize,
}

/// Thread-safe set of item keys backed by a JSON file
///
/// Entries are only ever added. Workers share one instance behind an `Arc`
/// and insert concurrently; the scheduler saves it once per cycle.
#[derive(Debug)]
pub struct SkipSet {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl SkipSet {
    /// Creates an empty set that will be saved to `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Loads a set from `path`
    ///
    /// A missing or undecodable file is not an error: the set starts empty
    /// and a warning is logged.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let set = Self::empty(path);

        match load_list(&set.path) {
            Ok(list) => {
                let mut entries = set.lock();
                entries.keys.extend(list);
                entries.persisted = entries.keys.len();
                tracing::info!(
                    "{} keys loaded from {}",
                    entries.keys.len(),
                    set.path.display()
                );
            }
            Err(e) => {
                tracing::warn!("Load keys from {} failed: {}", set.path.display(), e);
            }
        }

        set
    }

    /// File this set is persisted to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks whether a key is in the set
    pub fn contains(&self, key: &str) -> bool {
        self.lock().keys.contains(key)
    }

    /// Adds a key, returning `true` if it was not already present
    pub fn insert(&self, key: impl Into<String>) -> bool {
        self.lock().keys.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().keys.is_empty()
    }

    /// Whether the size changed since the last load or save
    pub fn is_dirty(&self) -> bool {
        let entries = self.lock();
        entries.keys.len() != entries.persisted
    }

    /// Sorted snapshot of all keys
    pub fn snapshot(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Writes the set to its file
    pub fn save(&self) -> StorageResult<()> {
        let keys = self.snapshot();
        save_list(&self.path, &keys)?;
        self.lock().persisted = keys.len();
        Ok(())
    }

    /// Writes the set only if it grew since the last load or save
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The set was written
    /// * `Ok(false)` - Nothing changed, no I/O performed
    pub fn save_if_changed(&self) -> StorageResult<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.save()?;
        tracing::info!("{} keys saved to {}", self.len(), self.path.display());
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Entries stay consistent even if a holder panicked: inserts are atomic.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads a JSON array of strings
pub fn load_list(path: &Path) -> StorageResult<Vec<String>> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Writes a JSON array of strings, replacing the file atomically
pub fn save_list(path: &Path, keys: &[String]) -> StorageResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, serde_json::to_vec(keys)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
