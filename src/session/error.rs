//! Session error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::sftp::{SftpError, TransferError};
use crate::ssh::SshError;

/// Coarse failure classes callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No credentials were ever supplied
    NotAuthenticated,
    /// Dial, handshake, auth or file-protocol setup failed
    Connectivity,
    /// The remote rejected an operation
    RemoteOperation,
    /// The local file system failed
    LocalIo,
    /// A check before the operation refused it
    Precondition,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Connection(#[from] SshError),

    #[error("SFTP initialization failed: {0}")]
    FileSessionUnavailable(#[source] SftpError),

    #[error(transparent)]
    Remote(#[from] SftpError),

    #[error("{}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("exist path")]
    TargetExists(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl SessionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::NotLoggedIn => ErrorCategory::NotAuthenticated,
            SessionError::Connection(_) | SessionError::FileSessionUnavailable(_) => {
                ErrorCategory::Connectivity
            }
            SessionError::Remote(_) => ErrorCategory::RemoteOperation,
            SessionError::LocalIo { .. } => ErrorCategory::LocalIo,
            SessionError::TargetExists(_) | SessionError::InvalidPath(_) => {
                ErrorCategory::Precondition
            }
        }
    }

    pub(crate) fn local(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SessionError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

impl From<TransferError> for SessionError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Local { path, source } => SessionError::LocalIo { path, source },
            TransferError::Remote(e) => SessionError::Remote(e),
        }
    }
}
