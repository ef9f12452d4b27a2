//! Handing files to a platform share surface, with a download fallback.
//!
//! Backups and reports can be "shared" (passed to whatever share facility the host offers)
//! or "downloaded" (written into the export directory). Hosts without a share facility use
//! [`NoShareTarget`] and always get the download.

use crate::{StoreError, StoreResult};
use std::fs;
use std::path::{Path, PathBuf};

/// A file ready to be shared or downloaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedFile {
    pub filename: String,
    pub media_type: String,
    pub title: String,
    pub text: String,
    pub bytes: Vec<u8>,
}

/// A platform surface able to accept files for sharing.
pub trait ShareTarget {
    /// Whether this target accepts `file`.
    fn can_share(&self, file: &SharedFile) -> bool;

    fn share(&self, file: &SharedFile) -> StoreResult<()>;
}

/// Share target for hosts with no share facility.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoShareTarget;

impl ShareTarget for NoShareTarget {
    fn can_share(&self, _file: &SharedFile) -> bool {
        false
    }

    fn share(&self, _file: &SharedFile) -> StoreResult<()> {
        Err(StoreError::Share("sharing is not available".into()))
    }
}

/// What happened to a file handed to [`share_or_download`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Downloaded(PathBuf),
}

/// Shares `file` if `target` accepts it, otherwise writes it into `export_dir`.
pub fn share_or_download(
    target: &dyn ShareTarget,
    file: &SharedFile,
    export_dir: &Path,
) -> StoreResult<ShareOutcome> {
    if target.can_share(file) {
        target.share(file)?;
        tracing::info!("shared {}", file.filename);
        return Ok(ShareOutcome::Shared);
    }

    tracing::info!(
        "sharing unavailable for {}, downloading instead",
        file.filename
    );
    write_download(export_dir, &file.filename, &file.bytes).map(ShareOutcome::Downloaded)
}

/// Writes `bytes` to `export_dir/filename`, creating the directory if needed.
pub fn write_download(export_dir: &Path, filename: &str, bytes: &[u8]) -> StoreResult<PathBuf> {
    if filename.contains(['/', '\\']) || filename.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!(
            "invalid download filename: {filename:?}"
        )));
    }
    fs::create_dir_all(export_dir).map_err(StoreError::FileWrite)?;
    let path = export_dir.join(filename);
    fs::write(&path, bytes).map_err(StoreError::FileWrite)?;
    tracing::info!("wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTarget {
        shared: RefCell<Vec<String>>,
    }

    impl ShareTarget for RecordingTarget {
        fn can_share(&self, file: &SharedFile) -> bool {
            file.media_type == "text/plain"
        }

        fn share(&self, file: &SharedFile) -> StoreResult<()> {
            self.shared.borrow_mut().push(file.filename.clone());
            Ok(())
        }
    }

    fn file(media_type: &str) -> SharedFile {
        SharedFile {
            filename: "backup.txt".into(),
            media_type: media_type.into(),
            title: "Backup".into(),
            text: String::new(),
            bytes: b"{}".to_vec(),
        }
    }

    #[test]
    fn shares_when_target_accepts() {
        let temp = TempDir::new().unwrap();
        let target = RecordingTarget::default();
        let outcome = share_or_download(&target, &file("text/plain"), temp.path()).unwrap();
        assert_eq!(outcome, ShareOutcome::Shared);
        assert_eq!(target.shared.borrow().len(), 1);
        assert!(!temp.path().join("backup.txt").exists());
    }

    #[test]
    fn falls_back_to_download() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("exports");
        let outcome = share_or_download(&NoShareTarget, &file("application/pdf"), &out).unwrap();
        assert_eq!(outcome, ShareOutcome::Downloaded(out.join("backup.txt")));
        assert_eq!(fs::read(out.join("backup.txt")).unwrap(), b"{}");
    }

    #[test]
    fn rejects_path_like_filenames() {
        let temp = TempDir::new().unwrap();
        assert!(write_download(temp.path(), "../x.pdf", b"").is_err());
    }
}
