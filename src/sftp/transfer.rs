//! Transfer engine
//!
//! Streaming single-file upload/download and recursive directory upload on
//! top of a borrowed `FileSession`. Callers hold the session lock; nothing in
//! here locks.
//!
//! Failures abort immediately. Whatever was already written stays written.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::error::SftpError;
use super::path_utils::{join_remote_path, remote_parent};
use super::session::FileSession;

#[derive(Error, Debug)]
pub enum TransferError {
    /// Reading or writing the local side failed
    #[error("{}: {source}", path.display())]
    Local {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The remote side failed
    #[error(transparent)]
    Remote(#[from] SftpError),
}

impl TransferError {
    fn local(path: &Path, source: io::Error) -> Self {
        TransferError::Local {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Totals for a directory upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub files: u64,
    pub directories: u64,
    pub bytes: u64,
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

async fn copy_stream<R, W>(reader: &mut R, writer: &mut W, buffer_size: usize) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buffer).await.map_err(CopyError::Read)?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buffer[..n])
            .await
            .map_err(CopyError::Write)?;
        total += n as u64;
    }
    writer.shutdown().await.map_err(CopyError::Write)?;
    Ok(total)
}

fn remote_io(path: &str, action: &str, err: io::Error) -> TransferError {
    TransferError::Remote(SftpError::from_remote_io(path, action, &err))
}

/// Stream one local file to `remote_path`, creating or truncating it
pub async fn upload_file(
    files: &dyn FileSession,
    local_path: &Path,
    remote_path: &str,
    buffer_size: usize,
) -> Result<u64, TransferError> {
    debug!("Uploading {} to {}", local_path.display(), remote_path);

    let mut local = tokio::fs::File::open(local_path)
        .await
        .map_err(|e| TransferError::local(local_path, e))?;
    let mut remote = files.create(remote_path).await?;

    let bytes = copy_stream(&mut local, &mut remote, buffer_size)
        .await
        .map_err(|e| match e {
            CopyError::Read(e) => TransferError::local(local_path, e),
            CopyError::Write(e) => remote_io(remote_path, "write", e),
        })?;

    debug!("Uploaded {} bytes to {}", bytes, remote_path);
    Ok(bytes)
}

/// Stream `remote_path` into `local_path`, creating or truncating it.
///
/// The parent of `local_path` must exist.
pub async fn download_file(
    files: &dyn FileSession,
    remote_path: &str,
    local_path: &Path,
    buffer_size: usize,
) -> Result<u64, TransferError> {
    debug!("Downloading {} to {}", remote_path, local_path.display());

    let mut remote = files.open_read(remote_path).await?;
    let mut local = tokio::fs::File::create(local_path)
        .await
        .map_err(|e| TransferError::local(local_path, e))?;

    let bytes = copy_stream(&mut remote, &mut local, buffer_size)
        .await
        .map_err(|e| match e {
            CopyError::Read(e) => remote_io(remote_path, "read", e),
            CopyError::Write(e) => TransferError::local(local_path, e),
        })?;

    debug!("Downloaded {} bytes from {}", bytes, remote_path);
    Ok(bytes)
}

/// Make sure `path` exists as a remote directory, creating missing parents.
///
/// An existing directory is fine; an existing non-directory is an error.
pub async fn ensure_remote_dir(files: &dyn FileSession, path: &str) -> Result<bool, SftpError> {
    match files.stat(path).await {
        Ok(meta) if meta.is_dir() => return Ok(false),
        Ok(_) => return Err(SftpError::NotADirectory(path.to_string())),
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let parent = remote_parent(path);
    if parent != "." && parent != "/" && parent != path {
        Box::pin(ensure_remote_dir(files, &parent)).await?;
    }

    match files.create_dir(path).await {
        Ok(()) => Ok(true),
        // Lost a race with someone else creating it
        Err(e) => match files.stat(path).await {
            Ok(meta) if meta.is_dir() => Ok(false),
            _ => Err(e),
        },
    }
}

/// Recursively upload `local_dir` so that it mirrors into `remote_dir`.
///
/// Re-running against an existing tree overwrites files and reuses directories.
pub async fn upload_dir(
    files: &dyn FileSession,
    local_dir: &Path,
    remote_dir: &str,
    buffer_size: usize,
) -> Result<TransferStats, TransferError> {
    info!("Uploading directory {} to {}", local_dir.display(), remote_dir);

    let mut stats = TransferStats::default();
    upload_dir_inner(files, local_dir, remote_dir, buffer_size, &mut stats).await?;

    info!(
        "Upload directory complete: {} files, {} directories created, {} bytes",
        stats.files, stats.directories, stats.bytes
    );
    Ok(stats)
}

async fn upload_dir_inner(
    files: &dyn FileSession,
    local_dir: &Path,
    remote_dir: &str,
    buffer_size: usize,
    stats: &mut TransferStats,
) -> Result<(), TransferError> {
    let mut entries = tokio::fs::read_dir(local_dir)
        .await
        .map_err(|e| TransferError::local(local_dir, e))?;

    if ensure_remote_dir(files, remote_dir).await? {
        stats.directories += 1;
    }

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TransferError::local(local_dir, e))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        let local_entry = entry.path();
        let remote_entry = join_remote_path(remote_dir, &name);

        let file_type = entry
            .file_type()
            .await
            .map_err(|e| TransferError::local(&local_entry, e))?;

        if file_type.is_dir() {
            // Boxed to keep the recursive future sized
            Box::pin(upload_dir_inner(
                files,
                &local_entry,
                &remote_entry,
                buffer_size,
                stats,
            ))
            .await?;
        } else {
            stats.bytes += upload_file(files, &local_entry, &remote_entry, buffer_size).await?;
            stats.files += 1;
        }
    }

    Ok(())
}
