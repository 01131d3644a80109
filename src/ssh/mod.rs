//! SSH module - dial, authenticate and own one SSH connection
//!
//! Built on russh. The raw `Handle` lives in a dedicated owner task
//! (`handle_owner`); everything else holds a `HandleController`.

mod client;
mod config;
mod error;
mod handle_owner;
mod transport;

pub use client::{host_key_fingerprint, ClientHandler, SshClient};
pub use config::{ConnectOptions, Credentials};
pub use error::SshError;
pub use handle_owner::{spawn_handle_owner_task, HandleCommand, HandleController, PingResult};
pub use transport::{Connector, SshConnector, SshTransport, Transport};
