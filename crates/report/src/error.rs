use pathlab_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to build PDF: {0}")]
    Pdf(String),
    #[error("invalid signature image: {0}")]
    Image(String),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;
