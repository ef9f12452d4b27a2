//! Constants used throughout the pathlab core crate.
//!
//! This module contains the persisted schema names, record keys and file naming constants
//! so that the store, the backup codec and the CLI agree on them.

/// Default directory for the local database when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "pathlab_data";

/// Default database name. Also embedded in backup bundles and backup filenames.
pub const DEFAULT_DATABASE_NAME: &str = "PathoReportDB";

/// Schema version of the local database.
pub const DATABASE_VERSION: u32 = 1;

/// Format name written into backup bundles.
pub const BUNDLE_FORMAT_NAME: &str = "dexie";

/// Highest backup bundle format version this crate understands.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Key of the lab-details singleton inside the `labInfo` table.
pub const LAB_DETAILS_KEY: &str = "labDetails";

/// Key of the taxonomy aggregate inside the `labInfo` table.
pub const TEST_GROUPS_KEY: &str = "testGroups";

/// Extension of per-record files written by the filesystem backend.
pub const RECORD_FILE_EXTENSION: &str = "json";

/// Suggested filename for taxonomy exports.
pub const TAXONOMY_EXPORT_FILENAME: &str = "testGroups.json";

/// Suggested filename for lab-details exports.
pub const LAB_DETAILS_EXPORT_FILENAME: &str = "lab-details.json";

/// Media type used when sharing backups; JSON attachments are not accepted by every share
/// surface, so shared backups travel as plain text.
pub const SHARED_BACKUP_MEDIA_TYPE: &str = "text/plain";

/// Media type of downloaded backups.
pub const BACKUP_MEDIA_TYPE: &str = "application/json";

/// Title and message attached to shared backups.
pub const SHARED_BACKUP_TITLE: &str = "Lab Records Backup";
pub const SHARED_BACKUP_TEXT: &str = "Here is my latest backup.";
