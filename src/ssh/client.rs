//! SSH Client implementation using russh

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use russh::client::{self, Handle};
use russh::keys::{PublicKey, PublicKeyBase64};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::config::{ConnectOptions, Credentials};
use super::error::SshError;
use crate::config::HostKeyPolicy;

/// Dials and password-authenticates one SSH connection
pub struct SshClient {
    credentials: Credentials,
    options: ConnectOptions,
}

impl SshClient {
    pub fn new(credentials: Credentials, options: ConnectOptions) -> Self {
        Self {
            credentials,
            options,
        }
    }

    /// Connect and authenticate, returning the raw russh handle.
    ///
    /// The connect timeout covers TCP connect, key exchange and authentication.
    pub async fn connect(self) -> Result<Handle<ClientHandler>, SshError> {
        let addr = self.credentials.address();
        let timeout = self.options.connect_timeout;

        info!("Connecting to SSH server at {}", addr);

        tokio::time::timeout(timeout, self.dial_and_authenticate())
            .await
            .map_err(|_| {
                SshError::Timeout(format!(
                    "Connection to {} timed out after {}s",
                    addr,
                    timeout.as_secs()
                ))
            })?
    }

    async fn dial_and_authenticate(&self) -> Result<Handle<ClientHandler>, SshError> {
        let ssh_config = client::Config {
            // Liveness is probed explicitly before every operation
            inactivity_timeout: None,
            keepalive_interval: self.options.keepalive_interval,
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = ClientHandler::new(
            self.credentials.host.clone(),
            self.credentials.port,
            self.options.host_key.clone(),
        );

        let mut handle = client::connect(
            Arc::new(ssh_config),
            (self.credentials.host.as_str(), self.credentials.port),
            handler,
        )
        .await
        .map_err(|e| match e {
            SshError::HostKeyRejected(_) => e,
            other => SshError::ConnectionFailed(other.to_string()),
        })?;

        debug!("SSH handshake completed");

        let auth = handle
            .authenticate_password(&self.credentials.username, &self.credentials.secret)
            .await
            .map_err(|e| SshError::AuthenticationFailed(e.to_string()))?;

        if !auth.success() {
            return Err(SshError::AuthenticationFailed(
                "Authentication rejected by server".to_string(),
            ));
        }

        info!(
            "SSH authentication successful for {}@{}",
            self.credentials.username,
            self.credentials.address()
        );

        Ok(handle)
    }
}

/// SHA256 fingerprint in OpenSSH notation (`SHA256:<base64, unpadded>`)
pub fn host_key_fingerprint(key: &PublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.public_key_bytes());
    let hash = hasher.finalize();
    format!("SHA256:{}", BASE64.encode(hash).trim_end_matches('='))
}

/// Client handler for russh callbacks
pub struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl ClientHandler {
    pub fn new(host: String, port: u16, policy: HostKeyPolicy) -> Self {
        Self { host, port, policy }
    }
}

impl client::Handler for ClientHandler {
    type Error = SshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = host_key_fingerprint(server_public_key);

        match &self.policy {
            HostKeyPolicy::AcceptAny => {
                // NOTE: no verification at all, any server key is trusted
                debug!(
                    "Accepting host key for {}:{} without verification ({})",
                    self.host, self.port, fingerprint
                );
                Ok(true)
            }
            HostKeyPolicy::Pinned { fingerprint: pinned } => {
                if *pinned == fingerprint {
                    info!("Host key matches pinned fingerprint for {}:{}", self.host, self.port);
                    Ok(true)
                } else {
                    warn!(
                        "Host key mismatch for {}:{}: pinned {}, got {}",
                        self.host, self.port, pinned, fingerprint
                    );
                    Err(SshError::HostKeyRejected(format!(
                        "{}:{} presented {}, expected {}",
                        self.host, self.port, fingerprint, pinned
                    )))
                }
            }
        }
    }
}
