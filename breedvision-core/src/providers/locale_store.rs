//! Persisted key-value storage for the selected locale

use crate::lock_or_recover;
use breedvision_common::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Key-value storage contract
///
/// Synchronous: locale switching completes within one step.
pub trait LocaleStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Volatile store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryLocaleStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryLocaleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, as if persisted by an earlier run
    pub fn with_value(self, key: &str, value: &str) -> Self {
        lock_or_recover(&self.values).insert(key.to_string(), value.to_string());
        self
    }

    /// Number of `set` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl LocaleStore for MemoryLocaleStore {
    fn get(&self, key: &str) -> Option<String> {
        lock_or_recover(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        lock_or_recover(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// TOML file of `key = "value"` pairs
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous selection intact.
pub struct FileLocaleStore {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl FileLocaleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl LocaleStore for FileLocaleStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable preferences file");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = lock_or_recover(&self.write_guard);

        // A corrupt file is replaced rather than blocking every future write
        let mut values = self.read_all().unwrap_or_default();
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(&values)?;
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryLocaleStore::new();
        assert_eq!(store.get("selectedLanguage"), None);
        store.set("selectedLanguage", "ta").unwrap();
        assert_eq!(store.get("selectedLanguage").as_deref(), Some("ta"));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.toml");

        FileLocaleStore::new(&path).set("selectedLanguage", "bn").unwrap();

        let reopened = FileLocaleStore::new(&path);
        assert_eq!(reopened.get("selectedLanguage").as_deref(), Some("bn"));
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocaleStore::new(dir.path().join("preferences.toml"));
        store.set("theme", "earth").unwrap();
        store.set("selectedLanguage", "hi").unwrap();
        store.set("selectedLanguage", "hi").unwrap();

        assert_eq!(store.get("theme").as_deref(), Some("earth"));
        assert_eq!(store.get("selectedLanguage").as_deref(), Some("hi"));
    }

    #[test]
    fn test_corrupt_file_reads_as_absent_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let store = FileLocaleStore::new(&path);
        assert_eq!(store.get("selectedLanguage"), None);
        store.set("selectedLanguage", "ur").unwrap();
        assert_eq!(store.get("selectedLanguage").as_deref(), Some("ur"));
    }
}
