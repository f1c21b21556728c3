//! Durable key-value persistence for the interval cache and favorites.
//!
//! Both consumers persist one small self-contained value, so the contract is
//! a whole-blob load/save rather than per-key IO. A JSON file satisfies it
//! in production; an in-memory slot satisfies it in tests.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Whole-value durable storage for one serializable blob.
pub trait DurableStore<T>: Send + Sync {
    /// Load the stored value, `None` when nothing was ever saved.
    fn load(&self) -> Result<Option<T>, StoreError>;

    /// Replace the stored value.
    fn save(&self, value: &T) -> Result<(), StoreError>;
}

/// Process-wide sequence for temp-file names, so concurrent saves to the
/// same path never share one.
static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

/// JSON-file-backed store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_string(&self) -> String {
        self.path.display().to_string()
    }
}

impl<T> DurableStore<T> for JsonFileStore
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn load(&self) -> Result<Option<T>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::ReadFailed {
                    path: self.path_string(),
                    source,
                })
            }
        };

        let value = serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path_string(),
            source,
        })?;

        Ok(Some(value))
    }

    fn save(&self, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::EncodeFailed {
            path: self.path_string(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::WriteFailed {
                    path: self.path_string(),
                    source,
                })?;
            }
        }

        // Write-then-rename so a crash mid-write cannot corrupt the file.
        // The temp name carries a unique sequence number: concurrent saves
        // each promote a complete file of their own and the last rename
        // wins.
        let seq = SAVE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.path.with_extension(format!("tmp.{seq}"));
        if let Err(source) = fs::write(&tmp, &json) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::WriteFailed {
                path: tmp.display().to_string(),
                source,
            });
        }
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::WriteFailed {
                path: self.path_string(),
                source,
            });
        }

        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    slot: Mutex<Option<T>>,
}

impl<T> MemoryStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Create a store pre-seeded with a value.
    pub fn with_value(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
        }
    }
}

impl<T> DurableStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync,
{
    fn load(&self) -> Result<Option<T>, StoreError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn save(&self, value: &T) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = Some(value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("funding_scanner_{}_{}", std::process::id(), name))
    }

    #[test]
    fn json_store_roundtrips() {
        let path = temp_path("roundtrip.json");
        let store = JsonFileStore::new(&path);

        let mut intervals = HashMap::new();
        intervals.insert("bybit:BTCUSDT".to_string(), 8.0);
        intervals.insert("bybit:SOLUSDT".to_string(), 4.0);
        store.save(&intervals).unwrap();

        let loaded: Option<HashMap<String, f64>> = store.load().unwrap();
        assert_eq!(loaded, Some(intervals));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn json_store_missing_file_is_none() {
        let store = JsonFileStore::new(temp_path("never_written.json"));

        let loaded: Option<HashMap<String, f64>> = store.load().unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn json_store_corrupt_file_is_an_error() {
        let path = temp_path("corrupt.json");
        fs::write(&path, b"{ not json").unwrap();
        let store = JsonFileStore::new(&path);

        let loaded: Result<Option<HashMap<String, f64>>, _> = store.load();
        assert!(matches!(loaded, Err(StoreError::Corrupt { .. })));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn json_store_creates_parent_dirs() {
        let dir = temp_path("nested_store_dir");
        let path = dir.join("deep").join("favorites.json");
        let store = JsonFileStore::new(&path);

        let favorites: Vec<String> = vec!["BTC".to_string()];
        store.save(&favorites).unwrap();
        let loaded: Option<Vec<String>> = store.load().unwrap();
        assert_eq!(loaded, Some(favorites));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn concurrent_saves_all_succeed_and_never_tear() {
        let path = temp_path("concurrent.json");
        let store = JsonFileStore::new(&path);

        std::thread::scope(|scope| {
            for thread in 0..4u64 {
                let store = &store;
                scope.spawn(move || {
                    for write in 0..100u64 {
                        let mut snapshot = HashMap::new();
                        snapshot.insert("seq".to_string(), (thread * 100 + write) as f64);
                        store.save(&snapshot).unwrap();
                    }
                });
            }
        });

        // Whatever landed last, it is one complete snapshot.
        let loaded: HashMap<String, f64> = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        let seq = loaded["seq"];
        assert!(seq.fract() == 0.0 && (0.0..400.0).contains(&seq));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn memory_store_roundtrips() {
        let store = MemoryStore::new();
        assert_eq!(DurableStore::<Vec<String>>::load(&store).unwrap(), None);

        store.save(&vec!["ETH".to_string()]).unwrap();
        assert_eq!(store.load().unwrap(), Some(vec!["ETH".to_string()]));
    }
}
