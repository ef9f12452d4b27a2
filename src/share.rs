use pathlab_core::{StoreError, StoreResult, ShareTarget, SharedFile};
use std::path::PathBuf;
use std::process::Command;

/// Shares files by running an external command with the file's path as its last argument.
///
/// The command line is split on whitespace; the share title and message are passed in the
/// `PATHLAB_SHARE_TITLE` and `PATHLAB_SHARE_TEXT` environment variables.
pub struct CommandShareTarget {
    program: String,
    args: Vec<String>,
    staging_dir: PathBuf,
}

impl CommandShareTarget {
    /// Returns `None` for a blank command line.
    pub fn new(command_line: &str, staging_dir: PathBuf) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            staging_dir,
        })
    }
}

impl ShareTarget for CommandShareTarget {
    fn can_share(&self, _file: &SharedFile) -> bool {
        true
    }

    fn share(&self, file: &SharedFile) -> StoreResult<()> {
        std::fs::create_dir_all(&self.staging_dir).map_err(StoreError::FileWrite)?;
        let path = self.staging_dir.join(&file.filename);
        std::fs::write(&path, &file.bytes).map_err(StoreError::FileWrite)?;

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .env("PATHLAB_SHARE_TITLE", &file.title)
            .env("PATHLAB_SHARE_TEXT", &file.text)
            .status()
            .map_err(|e| StoreError::Share(format!("failed to run {}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(StoreError::Share(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}
