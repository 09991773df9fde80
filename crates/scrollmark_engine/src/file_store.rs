//! File-backed storage tiers.
//!
//! `JsonFileStore` keeps every key in one JSON object, like the extension's
//! local settings area. A file that no longer parses is renamed to
//! `<name>.corrupt` and the store starts empty. `DirectoryStore` keeps one file per key and suits
//! large values such as screenshots.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use scrollmark_logging::scrollmark_warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::persist::{ensure_data_dir, AtomicFileWriter};
use crate::storage::{KeyValueStore, StorageError, Updater};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    writer: AtomicFileWriter,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ensure_data_dir(&dir)?;
        Ok(Self {
            path,
            writer: AtomicFileWriter::new(dir),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self) -> Result<BTreeMap<String, Value>, StorageError> {
        let content = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if content.is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_slice(&content) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                // Set the damaged file aside so seeding can start over.
                let aside = self.corrupt_path();
                scrollmark_warn!(
                    "Store file {:?} is corrupt ({}); moving it to {:?} and starting empty",
                    self.path,
                    err,
                    aside
                );
                if let Err(err) = fs::rename(&self.path, &aside) {
                    scrollmark_warn!("Could not move {:?} aside: {}", self.path, err);
                }
                Ok(BTreeMap::new())
            }
        }
    }

    fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn save(&self, entries: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(entries).map_err(StorageError::Encode)?;
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store.json".to_string());
        self.writer.write(&filename, &content)?;
        Ok(())
    }

    fn modify<R>(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, Value>) -> R,
    ) -> Result<R, StorageError> {
        let _guard = self.guard();
        let mut entries = self.load()?;
        let result = change(&mut entries);
        self.save(&entries)?;
        Ok(result)
    }
}

#[async_trait::async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.guard();
        Ok(self.load()?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    async fn update(&self, key: &str, updater: Updater) -> Result<(), StorageError> {
        self.modify(|entries| {
            if let Some(value) = updater(entries.remove(key)) {
                entries.insert(key.to_string(), value);
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.guard();
        Ok(self.load()?.into_keys().collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    key: String,
    value: Value,
}

/// One JSON file per key, named by a hash of the key. Each file records its
/// key so `keys()` can enumerate without a separate index.
#[derive(Debug)]
pub struct DirectoryStore {
    writer: AtomicFileWriter,
    lock: Mutex<()>,
}

impl DirectoryStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        ensure_data_dir(&dir)?;
        Ok(Self {
            writer: AtomicFileWriter::new(dir),
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.dir().join(record_filename(key));
        let content = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record: Record =
            serde_json::from_slice(&content).map_err(|source| StorageError::Corrupt {
                path: path.display().to_string(),
                source,
            })?;
        // A hash collision would surface as a record for another key.
        Ok((record.key == key).then_some(record.value))
    }

    fn write(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let record = Record {
            key: key.to_string(),
            value,
        };
        let content = serde_json::to_vec(&record).map_err(StorageError::Encode)?;
        self.writer.write(&record_filename(key), &content)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.dir().join(record_filename(key))) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for DirectoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.guard();
        self.read(key)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.guard();
        self.write(key, value)
    }

    async fn update(&self, key: &str, updater: Updater) -> Result<(), StorageError> {
        let _guard = self.guard();
        match updater(self.read(key)?) {
            Some(value) => self.write(key, value),
            None => self.remove(key),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        self.remove(key)
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.guard();
        let mut keys = Vec::new();
        for entry in fs::read_dir(self.dir())? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read(&path)?;
            if let Ok(record) = serde_json::from_slice::<Record>(&content) {
                keys.push(record.key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Deterministic, filesystem-safe name for `key`: `{sha256 prefix}.json`.
fn record_filename(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut name = String::with_capacity(21);
    for byte in digest.iter().take(8) {
        let _ = write!(&mut name, "{byte:02x}");
    }
    name.push_str(".json");
    name
}
