//! Filesystem backend.
//!
//! Layout:
//!
//! ```text
//! <data_dir>/<database_name>/
//!     patients/<key>.json
//!     testResults/<key>.json
//!     labInfo/<key>.json
//! ```
//!
//! Keys are escaped so any record id maps to a single safe file name. Every file write goes
//! through a temporary file and a rename.

use super::backend::{Backend, Snapshot, Table, TableRows};
use crate::constants::RECORD_FILE_EXTENSION;
use crate::{StoreError, StoreResult};
use serde_json::Value;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Opens the database directory, creating it and its tables if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Open` if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        // A crash between the two renames of `replace_all` leaves only the staged copy.
        let staging = sibling(&root, "staging");
        if !root.exists() && staging.is_dir() {
            tracing::warn!(
                "recovering database from interrupted restore: {}",
                staging.display()
            );
            fs::rename(&staging, &root).map_err(|source| StoreError::Open {
                path: root.clone(),
                source,
            })?;
        }

        for table in Table::ALL {
            let dir = root.join(table.name());
            fs::create_dir_all(&dir).map_err(|source| StoreError::Open { path: dir, source })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, table: Table, key: &str) -> PathBuf {
        record_path(&self.root, table, key)
    }
}

fn record_path(root: &Path, table: Table, key: &str) -> PathBuf {
    root.join(table.name())
        .join(format!("{}.{}", escape_key(key), RECORD_FILE_EXTENSION))
}

fn sibling(root: &Path, suffix: &str) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    root.with_file_name(format!(".{name}.{suffix}"))
}

/// Escapes a key into a file stem. ASCII alphanumerics, `-` and `_` are kept; every other
/// byte becomes `%XX`.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn unescape_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn write_atomic(path: &Path, row: &Value) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(row).map_err(StoreError::Serialization)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp, json).map_err(StoreError::FileWrite)?;
    fs::rename(&tmp, path).map_err(StoreError::FileWrite)
}

fn write_tables(root: &Path, snapshot: &Snapshot) -> StoreResult<()> {
    for table in Table::ALL {
        fs::create_dir_all(root.join(table.name())).map_err(StoreError::FileWrite)?;
        for (key, row) in snapshot.rows(table) {
            write_atomic(&record_path(root, table, key), row)?;
        }
    }
    Ok(())
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl Backend for FsBackend {
    fn get(&self, table: Table, key: &str) -> StoreResult<Option<Value>> {
        let path = self.record_path(table, key);
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::FileRead(e)),
        };
        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| StoreError::Deserialization(format!("{}: {e}", path.display())))
    }

    fn put(&mut self, table: Table, key: &str, row: &Value) -> StoreResult<()> {
        write_atomic(&self.record_path(table, key), row)
    }

    fn delete(&mut self, table: Table, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.record_path(table, key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(StoreError::FileWrite(e)),
            _ => Ok(()),
        }
    }

    fn scan(&self, table: Table) -> StoreResult<TableRows> {
        let dir = self.root.join(table.name());
        let mut rows = TableRows::new();

        let entries = match fs::read_dir(&dir) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(rows),
            Err(e) => return Err(StoreError::FileRead(e)),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.')
                || path.extension().and_then(|e| e.to_str()) != Some(RECORD_FILE_EXTENSION)
            {
                continue;
            }
            let Some(key) = unescape_key(stem) else {
                tracing::warn!("skipping record with unreadable name: {}", path.display());
                continue;
            };

            let row = fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
            match row {
                Some(row) => {
                    rows.insert(key, row);
                }
                None => tracing::warn!("skipping unreadable record: {}", path.display()),
            }
        }

        Ok(rows)
    }

    fn replace_all(&mut self, snapshot: &Snapshot) -> StoreResult<()> {
        let staging = sibling(&self.root, "staging");
        let retired = sibling(&self.root, "old");

        remove_dir_if_exists(&staging).map_err(StoreError::FileWrite)?;
        if let Err(e) = write_tables(&staging, snapshot) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        remove_dir_if_exists(&retired).map_err(StoreError::FileWrite)?;
        fs::rename(&self.root, &retired).map_err(StoreError::FileWrite)?;
        if let Err(e) = fs::rename(&staging, &self.root) {
            // Put the previous database back before reporting.
            let _ = fs::rename(&retired, &self.root);
            return Err(StoreError::FileWrite(e));
        }
        if let Err(e) = fs::remove_dir_all(&retired) {
            tracing::warn!("failed to remove {}: {e}", retired.display());
        }

        tracing::info!(
            "replaced database at {} ({} patients, {} result sets, {} lab records)",
            self.root.display(),
            snapshot.row_count(Table::Patients),
            snapshot.row_count(Table::TestResults),
            snapshot.row_count(Table::LabInfo),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn escapes_unsafe_keys() {
        assert_eq!(escape_key("1718000000000"), "1718000000000");
        assert_eq!(escape_key("../x"), "%2E%2E%2Fx");
        assert_eq!(unescape_key(&escape_key("a b/ü")), Some("a b/ü".into()));
        assert_eq!(unescape_key("%G1"), None);
    }

    #[test]
    fn put_get_delete_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut backend = FsBackend::open(temp.path().join("db")).unwrap();
        let row = json!({"id": "p/1", "name": "Asha"});

        backend.put(Table::Patients, "p/1", &row).unwrap();
        assert_eq!(backend.get(Table::Patients, "p/1").unwrap(), Some(row));
        assert_eq!(backend.scan(Table::Patients).unwrap().len(), 1);

        backend.delete(Table::Patients, "p/1").unwrap();
        backend.delete(Table::Patients, "p/1").unwrap();
        assert_eq!(backend.get(Table::Patients, "p/1").unwrap(), None);
    }

    #[test]
    fn scan_skips_corrupt_files() {
        let temp = TempDir::new().unwrap();
        let mut backend = FsBackend::open(temp.path().join("db")).unwrap();
        backend
            .put(Table::Patients, "ok", &json!({"id": "ok"}))
            .unwrap();
        fs::write(backend.root().join("patients").join("bad.json"), "{not json").unwrap();

        let rows = backend.scan(Table::Patients).unwrap();
        assert_eq!(rows.keys().collect::<Vec<_>>(), vec!["ok"]);
    }

    #[test]
    fn replace_all_swaps_whole_database() {
        let temp = TempDir::new().unwrap();
        let mut backend = FsBackend::open(temp.path().join("db")).unwrap();
        backend
            .put(Table::Patients, "old", &json!({"id": "old"}))
            .unwrap();

        let mut snapshot = Snapshot::new();
        snapshot.insert(Table::Patients, "new", json!({"id": "new"}));
        snapshot.insert(Table::LabInfo, "labDetails", json!({"id": "labDetails"}));
        backend.replace_all(&snapshot).unwrap();

        assert_eq!(backend.snapshot().unwrap(), snapshot);
        assert!(!temp.path().join(".db.old").exists());
        assert!(!temp.path().join(".db.staging").exists());
    }

    #[test]
    fn open_recovers_staged_database() {
        let temp = TempDir::new().unwrap();
        let staged = temp.path().join(".db.staging").join("patients");
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("a.json"), r#"{"id":"a"}"#).unwrap();

        let backend = FsBackend::open(temp.path().join("db")).unwrap();
        assert_eq!(backend.scan(Table::Patients).unwrap().len(), 1);
    }
}
