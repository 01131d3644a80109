//! SFTP module
//!
//! Remote file primitives (`FileSession`), listing types, remote path helpers
//! and the streaming transfer engine.

pub mod error;
pub mod path_utils;
pub mod session;
pub mod transfer;
pub mod types;

pub use error::SftpError;
pub use session::{FileSession, RemoteReader, RemoteWriter, SftpSession};
pub use transfer::{
    download_file, ensure_remote_dir, upload_dir, upload_file, TransferError, TransferStats,
};
pub use types::*;
