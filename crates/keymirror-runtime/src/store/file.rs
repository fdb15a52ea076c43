#![forbid(unsafe_code)]

//! JSON file backend for cross-session persistence.
//!
//! The whole store is one JSON document, rewritten on every mutation
//! (write-through). Entries live in a `BTreeMap` so the document is stable
//! under re-serialization and diffs cleanly.
//!
//! # Failure Modes
//!
//! - **Unreadable or malformed file on open**: surfaced as
//!   [`StoreError::Io`] / [`StoreError::Codec`]; a missing file opens as an
//!   empty store.
//! - **Failed flush**: the in-memory mutation is rolled back before the
//!   error propagates, so memory and file never diverge.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::backend::{StoreBackend, StoreError};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    entries: &'a BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// Store backend persisted as a single JSON file.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileBackend {
    /// Open `path`, loading any existing snapshot. A missing file yields an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => {
                let snapshot: Snapshot = serde_json::from_str(&raw)?;
                if snapshot.version != SNAPSHOT_VERSION {
                    return Err(StoreError::Unavailable(format!(
                        "unsupported snapshot version {} in {}",
                        snapshot.version,
                        path.display()
                    )));
                }
                snapshot.entries
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(StoreError::Io(err)),
        };
        Ok(Self { path, entries })
    }

    /// The file this backend persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            entries: &self.entries,
        })?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl StoreBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<Option<String>, StoreError> {
        let replaced = self.entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.flush() {
            // Roll back so memory matches the file.
            match &replaced {
                Some(old) => self.entries.insert(key.to_string(), old.clone()),
                None => self.entries.remove(key),
            };
            return Err(err);
        }
        Ok(replaced)
    }

    fn remove(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(removed) = self.entries.remove(key) else {
            return Ok(None);
        };
        if let Err(err) = self.flush() {
            self.entries.insert(key.to_string(), removed);
            return Err(err);
        }
        Ok(Some(removed))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::open(dir.path().join("store.json")).unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let mut backend = JsonFileBackend::open(&path).unwrap();
            backend.set("foo", "1").unwrap();
            backend.set("bar", "two").unwrap();
            backend.remove("bar").unwrap();
        }

        let reopened = JsonFileBackend::open(&path).unwrap();
        assert_eq!(reopened.get("foo").unwrap(), Some("1".to_string()));
        assert_eq!(reopened.get("bar").unwrap(), None);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn malformed_snapshot_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json at all").unwrap();

        match JsonFileBackend::open(&path) {
            Err(StoreError::Codec(_)) => {}
            other => panic!("expected codec error, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_version_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"version": 99, "entries": {}}"#).unwrap();

        match JsonFileBackend::open(&path) {
            Err(StoreError::Unavailable(reason)) => {
                assert!(reason.contains("99"), "reason: {reason}");
            }
            other => panic!("expected unavailable error, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_is_stable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut backend = JsonFileBackend::open(&path).unwrap();
        backend.set("b", "2").unwrap();
        backend.set("a", "1").unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        // BTreeMap ordering: "a" serializes before "b".
        assert!(raw.find("\"a\"").unwrap() < raw.find("\"b\"").unwrap());
    }
}
