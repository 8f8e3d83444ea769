//! File-backed storage (native)
//!
//! All keys live in one JSON object on disk. Writes go to a temp file that
//! is then renamed over the original, so a crash never leaves a half-written
//! store behind.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StorageError};

/// Key-value store persisted as a JSON object in a single file
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&json).map_err(|e| {
            StorageError::Backend(format!("{} is not a key-value file: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map().unwrap_or_else(|e| {
            log::warn!("Replacing unreadable storage file: {}", e);
            BTreeMap::new()
        });
        map.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&map)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
