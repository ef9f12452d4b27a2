//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Core services never read process-wide environment variables
//! themselves; the binary resolves them and builds a [`CoreConfig`].

use crate::validation::validate_database_name;
use crate::StoreResult;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    database_name: String,
    export_dir: PathBuf,
    seed_taxonomy: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Directory holding the local database.
    /// * `database_name` - Name of the database; used as its directory name and embedded in
    ///   backup bundles.
    /// * `export_dir` - Directory that receives downloaded backups and reports.
    /// * `seed_taxonomy` - Optional default taxonomy JSON loaded when the taxonomy is empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if `database_name` is not a safe directory name.
    pub fn new(
        data_dir: PathBuf,
        database_name: impl Into<String>,
        export_dir: PathBuf,
        seed_taxonomy: Option<PathBuf>,
    ) -> StoreResult<Self> {
        let database_name = database_name.into();
        validate_database_name(&database_name)?;

        Ok(Self {
            data_dir,
            database_name,
            export_dir,
            seed_taxonomy,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Directory holding this database's tables.
    pub fn database_dir(&self) -> PathBuf {
        self.data_dir.join(&self.database_name)
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn seed_taxonomy(&self) -> Option<&Path> {
        self.seed_taxonomy.as_deref()
    }
}
