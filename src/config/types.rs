//! Configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Current config file version
pub const CONFIG_VERSION: u32 = 1;

/// Tunables for the session manager and its transports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Config file version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Deadline for dial + handshake + authentication, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Deadline for the liveness keepalive, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Transport keepalive interval in seconds (0 = disabled)
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,

    /// Copy buffer for file transfers, in bytes
    #[serde(default = "default_buffer_size")]
    pub transfer_buffer_size: usize,

    /// Server host key acceptance
    #[serde(default)]
    pub host_key: HostKeyPolicy,
}

/// How server host keys are accepted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Trust whatever key the server presents.
    ///
    /// Offers no protection against a man in the middle.
    #[default]
    AcceptAny,
    /// Only accept a key with this `SHA256:...` fingerprint
    Pinned { fingerprint: String },
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_keepalive_interval() -> u64 {
    30
}

fn default_buffer_size() -> usize {
    512 * 1024
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            connect_timeout_secs: default_connect_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            keepalive_interval_secs: default_keepalive_interval(),
            transfer_buffer_size: default_buffer_size(),
            host_key: HostKeyPolicy::AcceptAny,
        }
    }
}

impl BridgeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_secs > 0).then(|| Duration::from_secs(self.keepalive_interval_secs))
    }

    /// Buffer size clamped to at least 1 byte
    pub fn buffer_size(&self) -> usize {
        self.transfer_buffer_size.max(1)
    }
}
