//! Key-value persistence for reading state
//!
//! The session stores plain strings under well-known keys, the same way a
//! browser reader keeps its state in local storage. Two backends are
//! provided: an in-memory map and a JSON file on disk.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("IO error accessing {path}: {source}", path = .0.display(), source = .1)]
    Io(PathBuf, #[source] std::io::Error),

    /// The backing file is not a JSON object of strings
    #[error("Corrupt state file {path}: {source}", path = .0.display(), source = .1)]
    Corrupt(PathBuf, #[source] serde_json::Error),
}

/// String key-value storage used to persist reading state
pub trait KeyValueStore {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store, used by tests and by hosts with their own persistence
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so the file on disk is always a complete object.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the state file at `path`, starting empty if it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let content =
                fs::read_to_string(&path).map_err(|e| StorageError::Io(path.clone(), e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| StorageError::Corrupt(path.clone(), e))?
            }
        } else {
            log::info!("No state file at {}, starting fresh", path.display());
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    /// Location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(parent.to_path_buf(), e))?;
        }

        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| StorageError::Corrupt(self.path.clone(), e))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, content).map_err(|e| StorageError::Io(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StorageError::Io(self.path.clone(), e))?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Storage keys for one open document
///
/// Position and bookmarks are scoped to the document; reader settings are
/// shared across documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    document_id: String,
}

impl StorageKeys {
    /// Font size in pixels, shared by all documents
    pub const FONT_SIZE: &'static str = "epub-font-size";

    /// Theme name, shared by all documents
    pub const THEME: &'static str = "epub-theme";

    /// Keys for the document with the given stable identifier
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
        }
    }

    /// Identifier of the document these keys belong to
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Fragment identifier of the last location read
    pub fn last_position(&self) -> String {
        format!("epub-last-position:{}", self.document_id)
    }

    /// JSON array of bookmarks
    pub fn bookmarks(&self) -> String {
        format!("epub-bookmarks:{}", self.document_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        {
            let mut store = FileStore::open(&path).unwrap();
            store.set("epub-theme", "sepia").unwrap();
            store.set("other", "x").unwrap();
            store.remove("other").unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("epub-theme").unwrap().as_deref(), Some("sepia"));
        assert_eq!(store.get("other").unwrap(), None);
        assert!(!path.with_file_name("state.json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(StorageError::Corrupt(_, _))));
    }

    #[test]
    fn test_storage_keys() {
        let keys = StorageKeys::new("frankenstein");
        assert_eq!(keys.last_position(), "epub-last-position:frankenstein");
        assert_eq!(keys.bookmarks(), "epub-bookmarks:frankenstein");
        assert_eq!(StorageKeys::FONT_SIZE, "epub-font-size");
    }
}
