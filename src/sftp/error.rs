//! SFTP Error types

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SftpError {
    #[error("No such file: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("SFTP subsystem not available: {0}")]
    SubsystemNotAvailable(String),

    #[error("SFTP protocol error: {0}")]
    ProtocolError(String),
}

impl SftpError {
    /// Whether the remote reported the path as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, SftpError::FileNotFound(_))
    }

    /// Classify a remote failure by its message, keeping the message.
    ///
    /// `detail` is appended verbatim: `"<path> (<detail>)"`.
    pub(crate) fn from_remote_message(path: &str, detail: &str) -> Self {
        let text = format!("{} ({})", path, detail);
        let lower = detail.to_ascii_lowercase();
        if lower.contains("no such file") || lower.contains("not found") {
            SftpError::FileNotFound(text)
        } else if lower.contains("permission denied") {
            SftpError::PermissionDenied(text)
        } else {
            SftpError::ProtocolError(format!("{}: {}", path, detail))
        }
    }

    /// Classify an I/O failure that happened while streaming a remote file
    pub(crate) fn from_remote_io(path: &str, action: &str, err: &io::Error) -> Self {
        let detail = format!("{} failed: {}", action, err);
        match err.kind() {
            io::ErrorKind::NotFound => SftpError::FileNotFound(format!("{} ({})", path, detail)),
            io::ErrorKind::PermissionDenied => {
                SftpError::PermissionDenied(format!("{} ({})", path, detail))
            }
            _ => Self::from_remote_message(path, &detail),
        }
    }
}
