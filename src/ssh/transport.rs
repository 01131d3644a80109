//! Transport abstraction
//!
//! `Connector` dials, `Transport` is one live authenticated connection. The
//! session manager only sees these traits; `SshConnector`/`SshTransport` are
//! the russh-backed implementations.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::SshClient;
use super::config::{ConnectOptions, Credentials};
use super::error::SshError;
use super::handle_owner::{spawn_handle_owner_task, HandleController, PingResult};
use crate::sftp::{FileSession, SftpError, SftpSession};

/// One authenticated connection to a remote endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identifier used to correlate log lines
    fn id(&self) -> &str;

    /// Round-trip a keepalive over the wire. Must not report `Ok` for a link
    /// that cannot carry traffic.
    async fn keepalive(&self, timeout: Duration) -> PingResult;

    /// Open a file-protocol session multiplexed over this transport
    async fn open_file_session(&self) -> Result<Box<dyn FileSession>, SftpError>;

    /// Best-effort close
    async fn close(&self);
}

/// Produces authenticated transports from credentials
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Transport>, SshError>;
}

/// russh-backed transport, driven through the handle owner task
pub struct SshTransport {
    id: String,
    controller: HandleController,
}

impl SshTransport {
    pub fn new(id: String, controller: HandleController) -> Self {
        Self { id, controller }
    }
}

#[async_trait]
impl Transport for SshTransport {
    fn id(&self) -> &str {
        &self.id
    }

    async fn keepalive(&self, timeout: Duration) -> PingResult {
        self.controller.ping(timeout).await
    }

    async fn open_file_session(&self) -> Result<Box<dyn FileSession>, SftpError> {
        let session = SftpSession::open(&self.controller, &self.id).await?;
        Ok(Box::new(session))
    }

    async fn close(&self) {
        debug!("Closing transport {}", self.id);
        self.controller.disconnect().await;
    }
}

/// Dials real SSH servers with password authentication
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    options: ConnectOptions,
}

impl SshConnector {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Transport>, SshError> {
        let handle = SshClient::new(credentials.clone(), self.options.clone())
            .connect()
            .await?;

        let connection_id = uuid::Uuid::new_v4().to_string();
        let controller = spawn_handle_owner_task(handle, connection_id.clone());

        info!(
            "Transport {} established to {}",
            connection_id,
            credentials.address()
        );
        Ok(Box::new(SshTransport::new(connection_id, controller)))
    }
}
