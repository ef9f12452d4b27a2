//! Command-line definitions for the `pathlab` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pathlab")]
#[command(about = "Pathology lab records, results and reports")]
pub struct Cli {
    /// Directory holding the local database (overrides PATHLAB_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Database name (overrides PATHLAB_DB_NAME)
    #[arg(long, global = true)]
    pub db_name: Option<String>,
    /// Directory receiving downloaded backups and reports (overrides PATHLAB_EXPORT_DIR)
    #[arg(long, global = true)]
    pub export_dir: Option<PathBuf>,
    /// Default taxonomy loaded while the taxonomy is empty (overrides PATHLAB_SEED_TAXONOMY)
    #[arg(long, global = true)]
    pub seed_taxonomy: Option<PathBuf>,
    /// Command run with the path of each shared file (overrides PATHLAB_SHARE_COMMAND)
    #[arg(long, global = true)]
    pub share_command: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which first-run setup steps are done
    SetupStatus,
    /// Patient intake and bookkeeping
    #[command(subcommand)]
    Patient(PatientCommand),
    /// Result entry
    #[command(subcommand)]
    Results(ResultsCommand),
    /// Test catalogue editing
    #[command(subcommand)]
    Taxonomy(TaxonomyCommand),
    /// Lab letterhead and signature
    #[command(subcommand)]
    Lab(LabCommand),
    /// Whole-database backup and restore
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Patient reports
    #[command(subcommand)]
    Report(ReportCommand),
}

/// Patient fields shared by `add` and `update`.
#[derive(Args, Default)]
pub struct PatientFields {
    #[arg(long)]
    pub name: Option<String>,
    /// Male, Female or any other text
    #[arg(long)]
    pub gender: Option<String>,
    /// Age in years; fractions such as 1.5 are allowed
    #[arg(long, conflicts_with = "new_born")]
    pub age: Option<f64>,
    /// Record the patient as a new-born
    #[arg(long)]
    pub new_born: bool,
    #[arg(long)]
    pub mobile: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub referred_by: Option<String>,
    #[arg(long)]
    pub consultant_doctor: Option<String>,
    /// Sample collection date (YYYY-MM-DD)
    #[arg(long)]
    pub sample_date: Option<String>,
    #[arg(long)]
    pub sample_type: Option<String>,
    /// Selected test group ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tests: Option<Vec<String>>,
}

#[derive(Subcommand)]
pub enum PatientCommand {
    /// Register a new patient
    Add(PatientFields),
    /// Change some fields of a patient
    Update {
        id: String,
        #[command(flatten)]
        fields: PatientFields,
    },
    /// Set workflow status (pending, active, complete)
    Status { id: String, status: String },
    /// Delete a patient and their results
    Delete { id: String },
    /// List patients, most recent first
    List {
        /// Filter by name, mobile or sample date
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one patient
    Show { id: String },
    /// Earlier patients matching a name or mobile number
    History {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        mobile: String,
    },
    /// Replace the test groups selected for a patient
    SelectTests { id: String, groups: Vec<String> },
}

#[derive(Subcommand)]
pub enum ResultsCommand {
    /// Enter values as PARAMETER_ID=VALUE; other entered values are kept
    Set {
        patient: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Show entered values
    Show { patient: String },
}

#[derive(Subcommand)]
pub enum TaxonomyCommand {
    /// Print groups, subgroups and parameters
    List,
    /// Export the taxonomy as JSON
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the taxonomy with an exported file
    Import { file: PathBuf },
    /// Load a default taxonomy if none exists
    Seed { file: Option<PathBuf> },
    /// Add a test group
    AddGroup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        classification: Option<String>,
        /// Interpretation remark printed under the group
        #[arg(long, default_value = "")]
        desc: String,
        /// Print a reference range column
        #[arg(long)]
        has_ranges: bool,
    },
    /// Change a group's name, classification, remark and range column
    UpdateGroup {
        group: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        classification: Option<String>,
        #[arg(long, default_value = "")]
        desc: String,
        #[arg(long)]
        has_ranges: bool,
    },
    DeleteGroup { group: String },
    AddSubgroup {
        group: String,
        #[arg(long)]
        name: String,
    },
    RenameSubgroup {
        group: String,
        subgroup: String,
        #[arg(long)]
        name: String,
    },
    DeleteSubgroup { group: String, subgroup: String },
    AddParameter {
        group: String,
        subgroup: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        unit: String,
        #[arg(long, default_value = "")]
        note: String,
        /// Reference range as CATEGORY:MIN:MAX, e.g. Female:12:15 or Common::200
        #[arg(long = "range")]
        ranges: Vec<String>,
    },
    /// Change a parameter in place, keeping its id and the results entered for it
    UpdateParameter {
        group: String,
        subgroup: String,
        parameter: String,
        #[command(flatten)]
        edit: ParameterEdit,
    },
    DeleteParameter {
        group: String,
        subgroup: String,
        parameter: String,
    },
}

/// Parameter fields for `update-parameter`; absent fields are kept.
#[derive(Args, Default)]
pub struct ParameterEdit {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
    /// Reference range as CATEGORY:MIN:MAX; replaces the range of that category
    #[arg(long = "range")]
    pub ranges: Vec<String>,
    /// Drop all existing ranges before applying --range
    #[arg(long)]
    pub clear_ranges: bool,
}

#[derive(Subcommand)]
pub enum LabCommand {
    Show,
    /// Export lab details as JSON
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Merge lab details from a JSON file
    Import { file: PathBuf },
    /// Store an image file as the doctor's signature
    SetSignature { image: PathBuf },
}

#[derive(Subcommand)]
pub enum BackupCommand {
    /// Write a backup bundle into the export directory
    Create,
    /// Restore a backup bundle
    Restore {
        file: PathBuf,
        /// merge (default) or replace
        #[arg(long, default_value = "merge")]
        strategy: String,
    },
    /// Share a fresh backup, or download it when sharing is unavailable
    Share,
}

#[derive(Args)]
pub struct ReportArgs {
    pub patient: String,
    /// Leave the reference range column empty
    #[arg(long)]
    pub no_ranges: bool,
    /// Omit parameter notes
    #[arg(long)]
    pub no_notes: bool,
}

#[derive(Subcommand)]
pub enum ReportCommand {
    /// Write the report PDF into the export directory
    Pdf {
        #[command(flatten)]
        args: ReportArgs,
        /// Share instead of downloading
        #[arg(long)]
        share: bool,
    },
    /// Print the composed report structure as JSON
    Describe {
        #[command(flatten)]
        args: ReportArgs,
    },
}
