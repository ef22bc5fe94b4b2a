//! Locally persisted UI state.
//!
//! A flat JSON object on disk, e.g. `{"theme": "dark"}`. Only the page-wide
//! reset clears it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use patchnotes_core::Error;

/// Key of the saved colour theme.
pub const THEME_KEY: &str = "theme";

/// JSON-file key/value store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl LocalStore {
    /// Open the store at `path`; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::State(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::State(format!("{}: {}", path.display(), e))),
        };
        Ok(Self { path, values })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set a value and write the file.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.values.insert(key.to_string(), value.into());
        self.save()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove every key and delete the file.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.values.clear();
        Self::discard(&self.path)
    }

    /// Delete the state file at `path` without reading it.
    ///
    /// Works on files `open` would reject, so a corrupt store can always be
    /// reset.
    pub fn discard(path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::State(format!("{}: {}", path.display(), e))),
        }
    }

    fn save(&self) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(&self.values)?;
        std::fs::write(&self.path, json).map_err(|e| Error::State(format!("{}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set(THEME_KEY, "dark").unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get_str(THEME_KEY), Some("dark"));
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set(THEME_KEY, "light").unwrap();
        store.clear().unwrap();

        assert!(!path.exists());
        assert!(LocalStore::open(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(LocalStore::open(&path), Err(Error::State(_))));
    }

    #[test]
    fn test_discard_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"not json").unwrap();

        LocalStore::discard(&path).unwrap();
        assert!(!path.exists());
        assert!(LocalStore::open(&path).unwrap().is_empty());

        LocalStore::discard(&path).unwrap();
    }
}
