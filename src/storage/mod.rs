//! On-device key-value storage.
//!
//! Values are JSON text. [`FileStore`] keeps one `<key>.json` file per key in
//! a data directory, [`MemoryStore`] keeps everything in process. Both publish
//! a [`StorageChange`] whenever a key is written or removed. Writes made by
//! other processes sharing a data directory are published once
//! [`FileStore::watch_directory`] is running.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON under key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Reads and parses the JSON document under `key`.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Json {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Last seen modification time and length of a key's file.
type Fingerprint = (SystemTime, u64);

pub struct FileStore {
    root: PathBuf,
    changes: broadcast::Sender<StorageChange>,
    seen: Mutex<HashMap<String, Fingerprint>>,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self {
            root,
            changes,
            seen: Mutex::new(HashMap::new()),
        };
        let snapshot = store.scan()?;
        *store.seen.lock().map_err(|_| StorageError::Poisoned)? = snapshot;
        Ok(store)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_key(key)))
    }

    fn notify(&self, key: &str) {
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
        });
    }

    /// Fingerprints of every `<key>.json` file currently in the data directory.
    fn scan(&self) -> Result<HashMap<String, Fingerprint>, StorageError> {
        let io_err = |source| StorageError::Io {
            key: self.root.display().to_string(),
            source,
        };
        let mut found = HashMap::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Removed between listing and stat.
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let modified = meta.modified().map_err(io_err)?;
            found.insert(key.to_string(), (modified, meta.len()));
        }
        Ok(found)
    }

    /// Records the current state of `key`'s file so the directory watcher
    /// does not announce this process's own write a second time.
    fn remember(&self, key: &str) {
        let Ok(mut seen) = self.seen.lock() else {
            return;
        };
        let name = sanitize_key(key);
        match fs::metadata(self.path_for(key)) {
            Ok(meta) => {
                if let Ok(modified) = meta.modified() {
                    seen.insert(name, (modified, meta.len()));
                }
            }
            Err(_) => {
                seen.remove(&name);
            }
        }
    }

    /// Compares the data directory against the last snapshot and publishes a
    /// [`StorageChange`] for every key whose file appeared, changed or
    /// disappeared. Returns the changed keys.
    pub fn poll_changes(&self) -> Result<Vec<String>, StorageError> {
        let current = self.scan()?;
        let mut seen = self.seen.lock().map_err(|_| StorageError::Poisoned)?;

        let mut changed: Vec<String> = current
            .iter()
            .filter(|(key, fingerprint)| seen.get(*key) != Some(*fingerprint))
            .map(|(key, _)| key.clone())
            .collect();
        changed.extend(seen.keys().filter(|k| !current.contains_key(*k)).cloned());
        changed.sort();
        *seen = current;
        drop(seen);

        for key in &changed {
            debug!(key, "Storage key changed on disk");
            self.notify(key);
        }
        Ok(changed)
    }

    /// Polls the data directory every `period` so writes made by other
    /// processes reach [`KeyValueStore::subscribe`] receivers.
    pub fn watch_directory(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            debug!(dir = %self.root.display(), ?period, "Storage directory watcher started");
            loop {
                interval.tick().await;
                if let Err(e) = self.poll_changes() {
                    warn!(error = %e, "Storage directory poll failed");
                }
            }
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        self.remember(key);
        self.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        }
        self.remember(key);
        self.notify(key);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

/// Keys become file names, so anything outside `[A-Za-z0-9_.-]` is replaced.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        {
            let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
            entries.insert(key.to_string(), value.to_string());
        }
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
        });
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        {
            let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
            entries.remove(key);
        }
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("anime_data_1").unwrap(), None);
        store.set("anime_data_1", r#"{"a":1}"#).unwrap();
        assert_eq!(
            store.get("anime_data_1").unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
        assert!(dir.path().join("anime_data_1.json").exists());

        store.remove("anime_data_1").unwrap();
        assert_eq!(store.get("anime_data_1").unwrap(), None);
        store.remove("anime_data_1").unwrap();
    }

    #[test]
    fn poll_reports_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = FileStore::open(dir.path()).unwrap();
        let writer = FileStore::open(dir.path()).unwrap();
        let mut rx = watcher.subscribe();

        watcher.set("anime_data_1", "[]").unwrap();
        assert_eq!(rx.try_recv().unwrap().key, "anime_data_1");
        assert!(watcher.poll_changes().unwrap().is_empty());

        writer.set("anime_app_user", r#"{"id":"9"}"#).unwrap();
        assert_eq!(watcher.poll_changes().unwrap(), vec!["anime_app_user"]);
        assert_eq!(rx.try_recv().unwrap().key, "anime_app_user");
        assert!(watcher.poll_changes().unwrap().is_empty());

        writer.remove("anime_app_user").unwrap();
        assert_eq!(watcher.poll_changes().unwrap(), vec!["anime_app_user"]);
    }

    #[test]
    fn keys_cannot_escape_the_data_dir() {
        assert_eq!(sanitize_key("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_key("anime_data_a@b"), "anime_data_a_b");
    }

    #[tokio::test]
    async fn writes_are_broadcast() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.set("anime_app_user", "{}").unwrap();
        store.remove("anime_app_user").unwrap();

        assert_eq!(rx.recv().await.unwrap().key, "anime_app_user");
        assert_eq!(rx.recv().await.unwrap().key, "anime_app_user");
    }

    #[test]
    fn read_json_reports_bad_documents() {
        let store = MemoryStore::new();
        store.set("k", "not json").unwrap();
        let err = read_json::<Vec<u32>>(&store, "k").unwrap_err();
        assert!(matches!(err, StorageError::Json { .. }));

        write_json(&store, "k", &vec![1u32, 2]).unwrap();
        assert_eq!(read_json::<Vec<u32>>(&store, "k").unwrap(), Some(vec![1, 2]));
    }
}
