//! Key-value backends for remembered preferences.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use crate::error::{StorageError, StorageResult};

/// String key-value capability backing the preferences.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Remove `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Keeps all values in one JSON object on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store backed by the JSON file at `path`, created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(StorageError::unavailable(
                format!("failed to read {}", self.path.display()),
                err,
            )),
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                StorageError::unavailable(format!("failed to create {}", parent.display()), err)
            })?;
        }
        let contents = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, contents).map_err(|err| {
            StorageError::unavailable(format!("failed to write {}", self.path.display()), err)
        })
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read()?;
        f(&mut values);
        self.write(&values)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// In-process store, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}
