//! sftp-bridge - remote file access over one shared SSH connection
//!
//! Authenticate once, then list, transfer, rename and delete remote files
//! through a single long-lived transport. The `SessionManager` probes the
//! connection before every operation and redials transparently when it has
//! dropped.

pub mod commands;
pub mod config;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod session;
pub mod sftp;
pub mod ssh;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{BridgeConfig, ConfigStorage, HostKeyPolicy};
pub use session::{ErrorCategory, LoginOutcome, SessionError, SessionManager, SessionStatus};
pub use sftp::{EntryKind, FileSession, ListingItem, RemoteEntry, SftpError};
pub use ssh::{Connector, Credentials, SshError, Transport};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber (`RUST_LOG`, default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
