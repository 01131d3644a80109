//! SSH connection parameters

use std::fmt;
use std::time::Duration;

use crate::config::{BridgeConfig, HostKeyPolicy};

/// Login credentials for the remote host.
///
/// Kept in memory only, so the manager can redial after the link drops.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Remote host address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Username for password authentication
    pub username: String,
    /// Password
    pub secret: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// `host:port` as used for dialing and logs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Transport-level knobs applied to every dial
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Deadline for TCP connect + handshake + authentication
    pub connect_timeout: Duration,
    /// russh keepalive interval, `None` disables it
    pub keepalive_interval: Option<Duration>,
    /// Server key acceptance
    pub host_key: HostKeyPolicy,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for ConnectOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            keepalive_interval: config.keepalive_interval(),
            host_key: config.host_key.clone(),
        }
    }
}
