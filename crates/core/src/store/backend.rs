//! Storage backends for the record store.
//!
//! A backend persists JSON rows in three named tables. It knows nothing about the record
//! types; typing happens in [`RecordStore`](super::RecordStore).

use crate::StoreResult;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The physical tables of the local database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Patients,
    TestResults,
    LabInfo,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Patients, Table::TestResults, Table::LabInfo];

    /// Table name as written into directories and backup bundles.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Patients => "patients",
            Table::TestResults => "testResults",
            Table::LabInfo => "labInfo",
        }
    }

    /// Field of each row that holds its primary key.
    pub fn key_path(&self) -> &'static str {
        match self {
            Table::Patients | Table::LabInfo => "id",
            Table::TestResults => "patientId",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Reads the primary key out of a row, accepting string or integer keys.
    pub fn row_key(&self, row: &Value) -> Option<String> {
        match row.get(self.key_path())? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rows of one table keyed by primary key.
pub type TableRows = BTreeMap<String, Value>;

/// A point-in-time copy of every table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    tables: BTreeMap<Table, TableRows>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: Table) -> impl Iterator<Item = (&String, &Value)> {
        self.tables.get(&table).into_iter().flat_map(|rows| rows.iter())
    }

    pub fn row_count(&self, table: Table) -> usize {
        self.tables.get(&table).map_or(0, BTreeMap::len)
    }

    pub fn get(&self, table: Table, key: &str) -> Option<&Value> {
        self.tables.get(&table)?.get(key)
    }

    /// Inserts or overwrites a row.
    pub fn insert(&mut self, table: Table, key: impl Into<String>, row: Value) {
        self.tables.entry(table).or_default().insert(key.into(), row);
    }

    pub fn remove(&mut self, table: Table, key: &str) -> Option<Value> {
        self.tables.get_mut(&table)?.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty)
    }

    /// Overlays every row of `other` onto this snapshot; colliding keys take `other`'s row.
    pub fn merge(&mut self, other: Snapshot) {
        for (table, rows) in other.tables {
            self.tables.entry(table).or_default().extend(rows);
        }
    }
}

/// Row-level persistence used by the record store.
pub trait Backend {
    fn get(&self, table: Table, key: &str) -> StoreResult<Option<Value>>;

    /// Inserts or replaces a row.
    fn put(&mut self, table: Table, key: &str, row: &Value) -> StoreResult<()>;

    /// Removes a row. Removing an absent key is not an error.
    fn delete(&mut self, table: Table, key: &str) -> StoreResult<()>;

    /// All readable rows of a table, in key order.
    fn scan(&self, table: Table) -> StoreResult<TableRows>;

    /// Replaces the whole database with `snapshot`. Either every table is replaced or none is.
    fn replace_all(&mut self, snapshot: &Snapshot) -> StoreResult<()>;

    fn snapshot(&self) -> StoreResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for table in Table::ALL {
            for (key, row) in self.scan(table)? {
                snapshot.insert(table, key, row);
            }
        }
        Ok(snapshot)
    }
}
