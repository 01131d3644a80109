//! SFTP Session
//!
//! `FileSession` is the set of remote primitives the session manager and the
//! transfer engine build on. `SftpSession` implements it over a russh-sftp
//! subsystem channel opened through the handle owner task.

use async_trait::async_trait;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::error::SftpError;
use super::types::{EntryKind, RemoteEntry, RemoteMetadata};
use crate::ssh::HandleController;

/// Readable remote file
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writable remote file
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Remote file-system primitives over one file-protocol channel
#[async_trait]
pub trait FileSession: Send + Sync {
    /// Directory entries in server order, without `.` and `..`
    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError>;

    /// Follows symlinks
    async fn stat(&self, path: &str) -> Result<RemoteMetadata, SftpError>;

    /// Open read-only
    async fn open_read(&self, path: &str) -> Result<RemoteReader, SftpError>;

    /// Create or truncate for writing
    async fn create(&self, path: &str) -> Result<RemoteWriter, SftpError>;

    async fn create_dir(&self, path: &str) -> Result<(), SftpError>;

    async fn remove_file(&self, path: &str) -> Result<(), SftpError>;

    /// Fails unless the directory is empty
    async fn remove_dir(&self, path: &str) -> Result<(), SftpError>;

    async fn rename(&self, from: &str, to: &str) -> Result<(), SftpError>;

    /// Best-effort close
    async fn close(&self);
}

/// SFTP Session wrapper
pub struct SftpSession {
    /// russh SFTP session
    sftp: RusshSftpSession,
    /// Transport this session is multiplexed over
    connection_id: String,
}

impl SftpSession {
    /// Open the SFTP subsystem on a new channel of the given connection
    pub async fn open(
        handle_controller: &HandleController,
        connection_id: &str,
    ) -> Result<Self, SftpError> {
        info!("Opening SFTP subsystem for connection {}", connection_id);

        let channel = handle_controller
            .open_session_channel()
            .await
            .map_err(|e| SftpError::ChannelError(e.to_string()))?;

        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            SftpError::SubsystemNotAvailable(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SftpError::SubsystemNotAvailable(e.to_string()))?;

        info!("SFTP subsystem opened for connection {}", connection_id);

        Ok(Self {
            sftp,
            connection_id: connection_id.to_string(),
        })
    }
}

/// Map a russh-sftp failure on `path`, keeping the server's status text
fn map_sftp_error(err: SftpErrorInner, path: &str) -> SftpError {
    match err {
        SftpErrorInner::Status(status) => {
            let detail = if status.error_message.is_empty() {
                status.status_code.to_string()
            } else {
                status.error_message
            };
            let text = format!("{} ({})", path, detail);
            match status.status_code {
                StatusCode::NoSuchFile => SftpError::FileNotFound(text),
                StatusCode::PermissionDenied => SftpError::PermissionDenied(text),
                _ => SftpError::from_remote_message(path, &detail),
            }
        }
        other => SftpError::from_remote_message(path, &other.to_string()),
    }
}

#[async_trait]
impl FileSession for SftpSession {
    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        debug!("Listing directory: {}", path);

        let read_dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        let entries: Vec<RemoteEntry> = read_dir
            .filter_map(|entry| {
                let name = entry.file_name();
                if name == "." || name == ".." {
                    return None;
                }
                let metadata = entry.metadata();
                Some(if metadata.is_dir() {
                    RemoteEntry::dir(name)
                } else {
                    RemoteEntry::file(name, metadata.size.unwrap_or(0))
                })
            })
            .collect();

        debug!("Listed {} entries in {}", entries.len(), path);
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<RemoteMetadata, SftpError> {
        let metadata = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;

        Ok(RemoteMetadata {
            kind: if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            size: metadata.size.unwrap_or(0),
        })
    }

    async fn open_read(&self, path: &str) -> Result<RemoteReader, SftpError> {
        let file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;
        Ok(Box::new(file))
    }

    async fn create(&self, path: &str) -> Result<RemoteWriter, SftpError> {
        let file = self
            .sftp
            .create(path)
            .await
            .map_err(|e| map_sftp_error(e, path))?;
        Ok(Box::new(file))
    }

    async fn create_dir(&self, path: &str) -> Result<(), SftpError> {
        info!("Creating directory: {}", path);
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }

    async fn remove_file(&self, path: &str) -> Result<(), SftpError> {
        info!("Removing file: {}", path);
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }

    async fn remove_dir(&self, path: &str) -> Result<(), SftpError> {
        info!("Removing directory: {}", path);
        self.sftp
            .remove_dir(path)
            .await
            .map_err(|e| map_sftp_error(e, path))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), SftpError> {
        info!("Renaming {} to {}", from, to);
        self.sftp
            .rename(from, to)
            .await
            .map_err(|e| map_sftp_error(e, from))
    }

    async fn close(&self) {
        if let Err(e) = self.sftp.close().await {
            debug!(
                "Ignoring SFTP close error on connection {}: {}",
                self.connection_id, e
            );
        }
    }
}
