//! # Pathlab Core
//!
//! Core data layer for the pathology-lab record keeper.
//!
//! This crate contains pure data operations over the local database:
//! - Patient, result, taxonomy and lab-details records ([`models`])
//! - The [`RecordStore`] and its storage backends
//! - Structural taxonomy edits ([`Taxonomy`])
//! - Whole-database backup and restore ([`BackupService`])
//! - Joining stored records into a printable [`ReportData`]
//!
//! **No presentation concerns**: report layout and PDF rendering live in `pathlab-report`,
//! and the command-line surface lives in the `pathlab` binary.

pub mod backup;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod report_data;
pub mod share;
pub mod store;
pub mod taxonomy;
pub mod validation;

pub use backup::{Backup, BackupService, RestoreStrategy, RestoreSummary};
pub use config::CoreConfig;
pub use error::{StoreError, StoreResult};
pub use models::{
    Age, Gender, Group, GroupDetails, LabDetails, LabDetailsUpdate, Parameter, Patient,
    PatientStatus, PatientUpdate, RangeCategory, ReferenceRange, Subgroup, TestResults,
};
pub use pathlab_types::{IdError, NonEmptyText, RecordId, TextError};
pub use report_data::{is_abnormal, resolve_range, ReportData};
pub use share::{NoShareTarget, ShareOutcome, ShareTarget, SharedFile};
pub use store::{Backend, FsBackend, MemoryBackend, RecordStore, SetupStatus};
pub use taxonomy::{Taxonomy, TaxonomyError, TaxonomyResult};
