//! Whole-database backup and restore.
//!
//! Backups use the Dexie export layout written by the browser release of the lab app, so a
//! bundle produced there restores here and vice versa:
//!
//! ```json
//! {
//!   "formatName": "dexie",
//!   "formatVersion": 1,
//!   "data": {
//!     "databaseName": "PathoReportDB",
//!     "databaseVersion": 1,
//!     "tables": [{ "name": "patients", "schema": "id", "rowCount": 1 }],
//!     "data": [{ "tableName": "patients", "inbound": true, "rows": [{ "id": "..." }] }]
//!   }
//! }
//! ```
//!
//! A bundle is decoded and every row checked against its record type before anything is
//! written. Restores then go through [`Backend::replace_all`], so a failed restore leaves
//! the database as it was.

use crate::config::CoreConfig;
use crate::constants::{
    BACKUP_MEDIA_TYPE, BUNDLE_FORMAT_NAME, BUNDLE_FORMAT_VERSION, DATABASE_VERSION,
    LAB_DETAILS_KEY, SHARED_BACKUP_MEDIA_TYPE, SHARED_BACKUP_TEXT, SHARED_BACKUP_TITLE,
    TEST_GROUPS_KEY,
};
use crate::models::{decode_slice, decode_value, LabDetailsRecord, Patient, ResultsRecord, TestGroupsRecord};
use crate::share::{share_or_download, write_download, ShareOutcome, ShareTarget, SharedFile};
use crate::store::{Backend, RecordStore, Snapshot, Table};
use crate::taxonomy::Taxonomy;
use crate::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Dexie marks rows holding non-JSON values (dates, blobs) with this key.
const DEXIE_TYPES_KEY: &str = "$types";

// ============================================================================
// Bundle wire format
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bundle {
    format_name: String,
    format_version: u32,
    data: BundleData,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleData {
    database_name: String,
    // Dexie reports IndexedDB versions divided by ten, so this is not always an integer.
    database_version: serde_json::Number,
    #[serde(default)]
    tables: Vec<TableSchema>,
    #[serde(default)]
    data: Vec<TableData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableSchema {
    name: String,
    schema: String,
    row_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableData {
    table_name: String,
    #[serde(default = "inbound_default")]
    inbound: bool,
    #[serde(default)]
    rows: Vec<Value>,
}

fn inbound_default() -> bool {
    true
}

// ============================================================================
// Public types
// ============================================================================

/// How a restored bundle combines with the existing database.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestoreStrategy {
    /// Wipe the database, then import the bundle.
    Replace,
    /// Import over the database; rows with colliding keys are overwritten, the rest are kept.
    #[default]
    Merge,
}

impl std::str::FromStr for RestoreStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(RestoreStrategy::Replace),
            "merge" => Ok(RestoreStrategy::Merge),
            other => Err(format!(
                "unknown restore strategy '{other}' (expected replace or merge)"
            )),
        }
    }
}

/// A backup written to the export directory.
#[derive(Clone, Debug)]
pub struct Backup {
    pub filename: String,
    pub blob: Vec<u8>,
    pub path: PathBuf,
}

/// Row counts per table after a restore.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub patients: usize,
    pub test_results: usize,
    pub lab_info: usize,
}

impl RestoreSummary {
    fn of(snapshot: &Snapshot) -> Self {
        Self {
            patients: snapshot.row_count(Table::Patients),
            test_results: snapshot.row_count(Table::TestResults),
            lab_info: snapshot.row_count(Table::LabInfo),
        }
    }
}

/// `<database>-backup-<timestamp>.<extension>`, with `:` and `.` in the timestamp replaced so
/// the name is valid on every filesystem.
pub fn backup_filename(database_name: &str, at: DateTime<Utc>, extension: &str) -> String {
    let stamp = at
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("{database_name}-backup-{stamp}.{extension}")
}

// ============================================================================
// Service
// ============================================================================

/// Creates, restores and shares database backups.
#[derive(Clone, Debug)]
pub struct BackupService {
    cfg: Arc<CoreConfig>,
}

impl BackupService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Serialises every table of `store` into a bundle.
    pub fn export_bundle<B: Backend>(&self, store: &RecordStore<B>) -> StoreResult<Vec<u8>> {
        let snapshot = store.snapshot()?;
        encode_bundle(self.cfg.database_name(), &snapshot)
    }

    /// Snapshots the database and writes the bundle into the export directory.
    pub fn backup_now<B: Backend>(&self, store: &RecordStore<B>) -> StoreResult<Backup> {
        let blob = self.export_bundle(store)?;
        let filename = backup_filename(self.cfg.database_name(), Utc::now(), "json");
        let path = write_download(self.cfg.export_dir(), &filename, &blob)?;
        tracing::info!("backup written to {} ({BACKUP_MEDIA_TYPE})", path.display());
        Ok(Backup {
            filename,
            blob,
            path,
        })
    }

    /// Restores a bundle file into `store`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Import` if the file is not a valid bundle. The store is unchanged
    /// on every error.
    pub fn restore_from_file<B: Backend>(
        &self,
        store: &mut RecordStore<B>,
        path: &Path,
        strategy: RestoreStrategy,
    ) -> StoreResult<RestoreSummary> {
        let bytes = std::fs::read(path).map_err(StoreError::FileRead)?;
        self.restore_from_bytes(store, &bytes, strategy)
    }

    pub fn restore_from_bytes<B: Backend>(
        &self,
        store: &mut RecordStore<B>,
        bytes: &[u8],
        strategy: RestoreStrategy,
    ) -> StoreResult<RestoreSummary> {
        let incoming = decode_bundle(bytes, self.cfg.database_name())?;

        let target = match strategy {
            RestoreStrategy::Replace => incoming,
            RestoreStrategy::Merge => {
                let mut current = store.snapshot()?;
                current.merge(incoming);
                current
            }
        };

        store.replace_all(&target)?;
        let summary = RestoreSummary::of(&target);
        tracing::info!(
            "restored backup ({strategy:?}): {} patients, {} result sets, {} lab records",
            summary.patients,
            summary.test_results,
            summary.lab_info
        );
        Ok(summary)
    }

    /// Builds a fresh bundle and shares it as a text file, downloading it when `target`
    /// cannot take it.
    pub fn share_latest_now<B: Backend>(
        &self,
        store: &RecordStore<B>,
        target: &dyn ShareTarget,
    ) -> StoreResult<ShareOutcome> {
        // Share surfaces commonly refuse JSON attachments, so the bundle travels as .txt.
        let file = SharedFile {
            filename: backup_filename(self.cfg.database_name(), Utc::now(), "txt"),
            media_type: SHARED_BACKUP_MEDIA_TYPE.to_string(),
            title: SHARED_BACKUP_TITLE.to_string(),
            text: SHARED_BACKUP_TEXT.to_string(),
            bytes: self.export_bundle(store)?,
        };
        share_or_download(target, &file, self.cfg.export_dir())
    }
}

// ============================================================================
// Encoding and decoding
// ============================================================================

fn encode_bundle(database_name: &str, snapshot: &Snapshot) -> StoreResult<Vec<u8>> {
    let bundle = Bundle {
        format_name: BUNDLE_FORMAT_NAME.to_string(),
        format_version: BUNDLE_FORMAT_VERSION,
        data: BundleData {
            database_name: database_name.to_string(),
            database_version: DATABASE_VERSION.into(),
            tables: Table::ALL
                .into_iter()
                .map(|table| TableSchema {
                    name: table.name().to_string(),
                    schema: table.key_path().to_string(),
                    row_count: snapshot.row_count(table),
                })
                .collect(),
            data: Table::ALL
                .into_iter()
                .map(|table| TableData {
                    table_name: table.name().to_string(),
                    inbound: true,
                    rows: snapshot.rows(table).map(|(_, row)| row.clone()).collect(),
                })
                .collect(),
        },
    };
    serde_json::to_vec(&bundle).map_err(StoreError::Serialization)
}

fn import_error(message: impl Into<String>) -> StoreError {
    StoreError::Import(message.into())
}

/// Decodes and validates a bundle into a snapshot of normalised rows.
fn decode_bundle(bytes: &[u8], database_name: &str) -> StoreResult<Snapshot> {
    let bundle: Bundle = decode_slice(bytes, "backup bundle").map_err(StoreError::Import)?;

    if bundle.format_name != BUNDLE_FORMAT_NAME {
        return Err(import_error(format!(
            "unsupported backup format '{}' (expected '{BUNDLE_FORMAT_NAME}')",
            bundle.format_name
        )));
    }
    if bundle.format_version == 0 || bundle.format_version > BUNDLE_FORMAT_VERSION {
        return Err(import_error(format!(
            "unsupported backup format version {} (supported: {BUNDLE_FORMAT_VERSION})",
            bundle.format_version
        )));
    }
    if bundle.data.database_name != database_name {
        tracing::warn!(
            "restoring backup of database '{}' into '{database_name}'",
            bundle.data.database_name
        );
    }

    let mut snapshot = Snapshot::new();
    for table_data in bundle.data.data {
        let table = Table::from_name(&table_data.table_name).ok_or_else(|| {
            import_error(format!("unknown table '{}' in backup", table_data.table_name))
        })?;
        if !table_data.inbound {
            return Err(import_error(format!(
                "table '{table}' uses out-of-line keys, which this database does not support"
            )));
        }

        for (index, mut row) in table_data.rows.into_iter().enumerate() {
            if let Some(obj) = row.as_object_mut() {
                obj.remove(DEXIE_TYPES_KEY);
            }
            let key = table.row_key(&row).ok_or_else(|| {
                import_error(format!(
                    "{table} row {index} has no '{}' key",
                    table.key_path()
                ))
            })?;
            let row = normalise_row(table, &key, row)
                .map_err(|e| import_error(format!("{table} row {index}: {e}")))?;
            snapshot.insert(table, key, row);
        }
    }

    Ok(snapshot)
}

/// Parses a row as its record type and re-serialises it in canonical form.
fn normalise_row(table: Table, key: &str, row: Value) -> Result<Value, String> {
    match table {
        Table::Patients => roundtrip::<Patient>(row, "patient"),
        Table::TestResults => roundtrip::<ResultsRecord>(row, "test results"),
        Table::LabInfo if key == LAB_DETAILS_KEY => {
            roundtrip::<LabDetailsRecord>(row, "lab details")
        }
        Table::LabInfo if key == TEST_GROUPS_KEY => {
            let record: TestGroupsRecord = decode_value(row, "test groups")?;
            let taxonomy = Taxonomy::validated(record.data).map_err(|e| e.to_string())?;
            serde_json::to_value(TestGroupsRecord::new(taxonomy.into_groups()))
                .map_err(|e| e.to_string())
        }
        Table::LabInfo => {
            tracing::warn!("keeping unrecognised labInfo record '{key}' as is");
            Ok(row)
        }
    }
}

fn roundtrip<T: DeserializeOwned + Serialize>(row: Value, what: &str) -> Result<Value, String> {
    let record: T = decode_value(row, what)?;
    serde_json::to_value(record).map_err(|e| e.to_string())
}
