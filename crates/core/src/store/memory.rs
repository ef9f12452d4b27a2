use super::backend::{Backend, Snapshot, Table, TableRows};
use crate::StoreResult;
use serde_json::Value;

/// In-process backend. Nothing survives the value being dropped.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    data: Snapshot,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, table: Table, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.data.get(table, key).cloned())
    }

    fn put(&mut self, table: Table, key: &str, row: &Value) -> StoreResult<()> {
        self.data.insert(table, key, row.clone());
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &str) -> StoreResult<()> {
        self.data.remove(table, key);
        Ok(())
    }

    fn scan(&self, table: Table) -> StoreResult<TableRows> {
        Ok(self
            .data
            .rows(table)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn replace_all(&mut self, snapshot: &Snapshot) -> StoreResult<()> {
        self.data = snapshot.clone();
        Ok(())
    }

    fn snapshot(&self) -> StoreResult<Snapshot> {
        Ok(self.data.clone())
    }
}
