//! Session Manager
//!
//! Owns the single transport + file-session pair and the credentials needed
//! to recreate it. Every operation takes the state lock for its whole
//! duration, so callers are served strictly one at a time.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::liveness::LivenessProber;
use crate::config::BridgeConfig;
use crate::sftp::path_utils::{join_local_path, remote_base_name, sibling_path};
use crate::sftp::{self, FileSession, RemoteEntry};
use crate::ssh::{ConnectOptions, Connector, Credentials, SshConnector, Transport};

/// Result of a successful login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A new connection was established
    Connected,
    /// A healthy connection already existed and was kept
    AlreadyConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connected,
}

/// Transport and the file session multiplexed over it. Always created and
/// dropped together.
pub struct ConnectionPair {
    transport: Box<dyn Transport>,
    files: Box<dyn FileSession>,
}

impl ConnectionPair {
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn files(&self) -> &dyn FileSession {
        self.files.as_ref()
    }

    /// Close the file session, then the transport. Errors are swallowed.
    async fn close(self) {
        debug!("Closing connection pair on transport {}", self.transport.id());
        self.files.close().await;
        self.transport.close().await;
    }
}

#[derive(Default)]
struct SessionState {
    credentials: Option<Credentials>,
    connection: Option<ConnectionPair>,
}

pub struct SessionManager {
    connector: Arc<dyn Connector>,
    prober: LivenessProber,
    buffer_size: usize,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>, config: &BridgeConfig) -> Self {
        Self {
            connector,
            prober: LivenessProber::new(config.probe_timeout()),
            buffer_size: config.buffer_size(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Manager that dials real SSH servers
    pub fn with_ssh(config: &BridgeConfig) -> Self {
        let connector = SshConnector::new(ConnectOptions::from(config));
        Self::new(Arc::new(connector), config)
    }

    /// Establish a connection, or keep the current one if it is still healthy.
    ///
    /// Credentials are only replaced when a new connection succeeds.
    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, SessionError> {
        let mut state = self.state.lock().await;

        let healthy = match &state.connection {
            Some(pair) => self.prober.is_usable(pair.transport()).await,
            None => false,
        };
        if healthy {
            info!("Login to {}: already connected", credentials.address());
            return Ok(LoginOutcome::AlreadyConnected);
        }

        if let Some(stale) = state.connection.take() {
            warn!("Dropping unresponsive connection before login");
            stale.close().await;
        }

        info!(
            "Logging in to {} as {}",
            credentials.address(),
            credentials.username
        );
        let pair = self.establish(&credentials).await?;
        info!("Logged in to {}", credentials.address());

        state.credentials = Some(credentials);
        state.connection = Some(pair);
        Ok(LoginOutcome::Connected)
    }

    /// Entries of a remote directory, in the order the server sent them
    pub async fn list(&self, remote_path: &str) -> Result<Vec<RemoteEntry>, SessionError> {
        let mut state = self.state.lock().await;
        let pair = self.ensure_connected(&mut state).await?;

        debug!("list {}", remote_path);
        Ok(pair.files().read_dir(remote_path).await?)
    }

    /// Copy a remote file into `local_dir`, keeping its base name
    pub async fn download(&self, remote_path: &str, local_dir: &Path) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let pair = self.ensure_connected(&mut state).await?;

        let name = remote_base_name(remote_path)
            .ok_or_else(|| SessionError::InvalidPath(remote_path.to_string()))?;
        let target = join_local_path(local_dir, name);

        let bytes =
            sftp::download_file(pair.files(), remote_path, &target, self.buffer_size).await?;
        info!(
            "Downloaded {} to {} ({} bytes)",
            remote_path,
            target.display(),
            bytes
        );
        Ok(())
    }

    /// Upload a local file or directory tree to `remote_path`
    pub async fn upload(&self, remote_path: &str, local_path: &Path) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let pair = self.ensure_connected(&mut state).await?;

        let metadata = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| SessionError::local(local_path, e))?;

        if metadata.is_dir() {
            sftp::upload_dir(pair.files(), local_path, remote_path, self.buffer_size).await?;
        } else {
            let bytes =
                sftp::upload_file(pair.files(), local_path, remote_path, self.buffer_size).await?;
            info!(
                "Uploaded {} to {} ({} bytes)",
                local_path.display(),
                remote_path,
                bytes
            );
        }
        Ok(())
    }

    /// Remove a remote file or an empty remote directory
    pub async fn delete(&self, remote_path: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let pair = self.ensure_connected(&mut state).await?;

        let metadata = pair.files().stat(remote_path).await?;
        if metadata.is_dir() {
            pair.files().remove_dir(remote_path).await?;
        } else {
            pair.files().remove_file(remote_path).await?;
        }
        info!("Deleted {}", remote_path);
        Ok(())
    }

    /// Rename within the same directory. Never overwrites.
    pub async fn rename(&self, old_path: &str, new_name: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        let pair = self.ensure_connected(&mut state).await?;

        let new_path = sibling_path(old_path, new_name);

        pair.files().stat(old_path).await?;
        match pair.files().stat(&new_path).await {
            Ok(_) => return Err(SessionError::TargetExists(new_path)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        pair.files().rename(old_path, &new_path).await?;
        info!("Renamed {} to {}", old_path, new_path);
        Ok(())
    }

    /// Close the connection. Credentials are kept, so the next operation
    /// reconnects.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.credentials.is_none() {
            return Err(SessionError::NotLoggedIn);
        }

        if let Some(pair) = state.connection.take() {
            pair.close().await;
            info!("Disconnected");
        }
        Ok(())
    }

    /// Close the connection and forget the credentials
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if let Some(pair) = state.connection.take() {
            pair.close().await;
        }
        state.credentials = None;
        info!("Session shut down");
    }

    pub async fn status(&self) -> SessionStatus {
        if self.state.lock().await.connection.is_some() {
            SessionStatus::Connected
        } else {
            SessionStatus::Disconnected
        }
    }

    pub async fn has_credentials(&self) -> bool {
        self.state.lock().await.credentials.is_some()
    }

    /// Return a usable pair, reconnecting once with the stored credentials if
    /// the current one is missing or fails the probe.
    async fn ensure_connected<'a>(
        &self,
        state: &'a mut SessionState,
    ) -> Result<&'a ConnectionPair, SessionError> {
        let healthy = match &state.connection {
            Some(pair) => self.prober.is_usable(pair.transport()).await,
            None => false,
        };

        if !healthy {
            let credentials = state
                .credentials
                .clone()
                .ok_or(SessionError::NotLoggedIn)?;

            if let Some(stale) = state.connection.take() {
                warn!("Connection to {} lost, reconnecting", credentials.address());
                stale.close().await;
            } else {
                info!("Reconnecting to {}", credentials.address());
            }

            let pair = self.establish(&credentials).await.map_err(|e| {
                warn!("Reconnect to {} failed: {}", credentials.address(), e);
                e
            })?;
            state.connection = Some(pair);
        }

        state.connection.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    /// Dial, then open the file session. A transport whose file session
    /// fails is closed before returning.
    async fn establish(&self, credentials: &Credentials) -> Result<ConnectionPair, SessionError> {
        let transport = self.connector.connect(credentials).await?;

        match transport.open_file_session().await {
            Ok(files) => Ok(ConnectionPair { transport, files }),
            Err(e) => {
                warn!(
                    "File session on transport {} failed: {}",
                    transport.id(),
                    e
                );
                transport.close().await;
                Err(SessionError::FileSessionUnavailable(e))
            }
        }
    }
}
