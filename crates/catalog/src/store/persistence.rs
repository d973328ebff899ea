//! Snapshot persistence for the in-memory store - save/load JSON files.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::memory::{MemoryStore, StoreState};
use crate::error::{CatalogError, Result};

/// Current snapshot file format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// On-disk form of a [`MemoryStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub state: StoreState,
}

impl Snapshot {
    fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CatalogError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            CatalogError::Persistence(format!("Failed to create file '{}': {}", path.display(), e))
        })?;

        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|e| {
            CatalogError::Persistence(format!("Failed to serialize snapshot: {}", e))
        })
    }

    fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            CatalogError::Persistence(format!("Failed to open file '{}': {}", path.display(), e))
        })?;

        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            CatalogError::Persistence(format!(
                "Failed to parse snapshot '{}': {}",
                path.display(),
                e
            ))
        })?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(CatalogError::Persistence(format!(
                "Snapshot '{}' has format version {}, newest supported is {}",
                path.display(),
                snapshot.format_version,
                SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

impl MemoryStore {
    /// Save the committed state to a JSON file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use catalog::store::MemoryStore;
    /// # fn example(store: &MemoryStore) -> catalog::Result<()> {
    /// store.save("catalog.json")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            state: self.snapshot()?,
        };
        snapshot.write(path)?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Load a store from a JSON snapshot.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = Snapshot::read(path.as_ref())?;
        Ok(MemoryStore::from_state(snapshot.state))
    }

    /// Load a store from a snapshot, or start empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(MemoryStore::new())
        }
    }

    /// Save with snapshot history.
    ///
    /// The previous snapshot is copied into a `.history` directory, named by
    /// its save time, before the new one is written:
    ///
    /// ```text
    /// data/
    /// ├── catalog.json
    /// └── catalog.history/
    ///     └── 2026-01-30T10-00-00.json
    /// ```
    pub fn save_with_history(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            archive_snapshot(path)?;
        }
        self.save(path)
    }

    /// List historical snapshots, newest first.
    pub fn list_history(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let history_dir = history_directory(path.as_ref());
        if !history_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&history_dir)
            .map_err(|e| {
                CatalogError::Persistence(format!(
                    "Failed to read history directory '{}': {}",
                    history_dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();

        entries.sort_by(|a, b| b.cmp(a));
        Ok(entries)
    }

    /// Load a historical snapshot by index (0 = most recent).
    pub fn load_history(path: impl AsRef<Path>, index: usize) -> Result<Self> {
        let history = Self::list_history(&path)?;
        let history_path = history.get(index).ok_or_else(|| {
            CatalogError::Persistence(format!(
                "History snapshot {} not found (only {} available)",
                index,
                history.len()
            ))
        })?;
        Self::load(history_path)
    }
}

fn archive_snapshot(path: &Path) -> Result<()> {
    let history_dir = history_directory(path);
    if !history_dir.exists() {
        fs::create_dir_all(&history_dir).map_err(|e| {
            CatalogError::Persistence(format!(
                "Failed to create history directory '{}': {}",
                history_dir.display(),
                e
            ))
        })?;
    }

    let existing = Snapshot::read(path)?;
    let timestamp = existing.saved_at.format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
    existing.write(&history_dir.join(format!("{}.json", timestamp)))
}

/// History directory for a snapshot file.
fn history_directory(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}.history", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocKind, GraphStore};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_history_directory() {
        let path = Path::new("data/catalog.json");
        assert_eq!(
            history_directory(path).to_string_lossy(),
            "data/catalog.history"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");

        let store = MemoryStore::new();
        store
            .transact(|tx| tx.insert(DocKind::Organization, json!({"name": "Lab"})))
            .unwrap();
        store.save(&path).unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.snapshot().unwrap(), store.snapshot().unwrap());
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.stats().unwrap().documents_of(DocKind::Record), 0);
    }

    #[test]
    fn test_save_with_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");

        let store = MemoryStore::new();
        store.save_with_history(&path).unwrap();
        assert!(MemoryStore::list_history(&path).unwrap().is_empty());

        store
            .transact(|tx| tx.insert(DocKind::User, json!({"email": "a@b.c"})))
            .unwrap();
        store.save_with_history(&path).unwrap();

        let history = MemoryStore::list_history(&path).unwrap();
        assert_eq!(history.len(), 1);

        let previous = MemoryStore::load_history(&path, 0).unwrap();
        assert_eq!(previous.stats().unwrap().documents_of(DocKind::User), 0);
        assert!(MemoryStore::load_history(&path, 1).is_err());
    }

    #[test]
    fn test_load_garbage_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        let err = MemoryStore::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Persistence(_)));
    }
}
