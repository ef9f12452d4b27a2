use crate::taxonomy::TaxonomyError;
use pathlab_types::IdError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid record id: {0}")]
    InvalidId(#[from] IdError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error(
        "failed to open record store at {path}: {source}",
        path = path.display()
    )]
    Open {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(String),
    #[error("import failed: {0}")]
    Import(String),
    #[error("taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),
    #[error("share failed: {0}")]
    Share(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
