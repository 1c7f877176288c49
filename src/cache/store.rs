//! Durable file-per-entry JSON store.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{CacheError, CacheResult};

const JSON_EXTENSION: &str = "json";

const TEMP_EXTENSION: &str = "json.tmp";

#[derive(Debug, Clone)]
/// Stores one JSON file per key under a root directory.
///
/// Writes go to a temporary file that is renamed into place, so readers never observe a
/// half-written entry.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensures the root directory exists.
    pub fn ensure_root(&self) -> CacheResult<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|_| CacheError::StorageUnavailable {
                path: self.root.clone(),
            })?;
        }
        Ok(())
    }

    fn entry_path(&self, key: &[u8; 32]) -> PathBuf {
        self.root
            .join(format!("{}.{}", blake3::Hash::from(*key).to_hex(), JSON_EXTENSION))
    }

    fn temp_entry_path(&self, key: &[u8; 32]) -> PathBuf {
        self.root
            .join(format!("{}.{}", blake3::Hash::from(*key).to_hex(), TEMP_EXTENSION))
    }

    /// Writes `value` under `key`, replacing any previous entry.
    pub fn store<V: Serialize>(&self, key: &[u8; 32], value: &V) -> CacheResult<()> {
        self.ensure_root()?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let temp_path = self.temp_entry_path(key);
        let final_path = self.entry_path(key);

        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &final_path)?;
        Ok(())
    }

    /// Loads the entry for `key`, or `None` if there is none.
    pub fn load<V: DeserializeOwned>(&self, key: &[u8; 32]) -> CacheResult<Option<V>> {
        let bytes = match fs::read(self.entry_path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Deletes the entry for `key`. Returns `true` if one existed.
    pub fn remove(&self, key: &[u8; 32]) -> CacheResult<bool> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
