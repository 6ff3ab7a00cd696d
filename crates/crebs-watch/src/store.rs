use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::snapshot::Snapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("State file {0} is locked by another run")]
    Locked(PathBuf),
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Durable home of the last reported snapshot.
pub trait SnapshotStore {
    /// Returns the persisted snapshot, or an empty one when there is none or
    /// it cannot be read.
    fn load(&self) -> Snapshot;

    /// Replaces the persisted snapshot wholesale.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Snapshot stored as a single JSON object on disk.
///
/// A sibling `.lock` file is held exclusively for the lifetime of the store,
/// so two runs cannot interleave their read and overwrite.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    _lock: File,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lock_path = lock_path(&path);

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::io(&lock_path, e))?;
        lock.try_lock_exclusive()
            .map_err(|_| StoreError::Locked(path.clone()))?;

        log::debug!("Acquired state lock {}", lock_path.display());
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Snapshot {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No previous state at {}", self.path.display());
                return Snapshot::new();
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", self.path.display(), e);
                return Snapshot::new();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!(
                "Discarding unreadable state {}: {}",
                self.path.display(),
                e
            );
            Snapshot::new()
        })
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(snapshot)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        log::info!(
            "Saved {} entries to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        [
            ("RES_Audit".to_string(), "Pass".to_string()),
            (
                "BOOK_Taxation".to_string(),
                "Under Process | -".to_string(),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.load().is_empty());

        fs::write(&path, r#"{"RES_Audit": 42}"#).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.save(&sample()).unwrap();
        assert_eq!(store.load(), sample());

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["RES_Audit"], "Pass");
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("state.json")).unwrap();
        store.save(&sample()).unwrap();

        let replacement: Snapshot = [("RES_Law".to_string(), "Fail".to_string())]
            .into_iter()
            .collect();
        store.save(&replacement).unwrap();

        assert_eq!(store.load(), replacement);
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let first = JsonFileStore::open(&path).unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Locked(_))
        ));

        drop(first);
        assert!(JsonFileStore::open(&path).is_ok());
    }
}
