//! Handle Owner Task
//!
//! Only one task owns the `Handle<ClientHandler>`. Everything else talks to it
//! through a cloneable `HandleController` that sends commands over an mpsc
//! channel, so the handle is never shared behind a lock.
//!
//! ```ignore
//! let controller = spawn_handle_owner_task(handle, connection_id);
//! let channel = controller.open_session_channel().await?;
//! let alive = controller.ping(Duration::from_secs(5)).await == PingResult::Ok;
//! ```

use std::time::Duration;

use russh::client::{Handle, Msg};
use russh::Channel;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::client::ClientHandler;
use super::error::SshError;

/// Outcome of a keepalive round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingResult {
    /// Server acknowledged the keepalive
    Ok,
    /// No acknowledgement within the deadline
    Timeout,
    /// Transport is gone (owner task exited or SSH disconnect)
    IoError,
}

/// Commands sent to the Handle Owner Task
pub enum HandleCommand {
    /// Open a session channel (used for the SFTP subsystem)
    ChannelOpenSession {
        reply_tx: oneshot::Sender<Result<Channel<Msg>, russh::Error>>,
    },

    /// Send `keepalive@openssh.com` with want-reply and wait for the answer
    Ping {
        timeout: Duration,
        reply_tx: oneshot::Sender<PingResult>,
    },

    /// Disconnect the SSH connection
    Disconnect,
}

/// Controller for sending commands to the Handle Owner Task
#[derive(Clone)]
pub struct HandleController {
    cmd_tx: mpsc::Sender<HandleCommand>,
}

impl HandleController {
    /// Wrap an existing command sender.
    ///
    /// Production code goes through `spawn_handle_owner_task`.
    pub fn new(cmd_tx: mpsc::Sender<HandleCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Open a session channel
    pub async fn open_session_channel(&self) -> Result<Channel<Msg>, SshError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(HandleCommand::ChannelOpenSession { reply_tx })
            .await
            .map_err(|_| SshError::Disconnected)?;
        reply_rx
            .await
            .map_err(|_| SshError::Disconnected)?
            .map_err(|e| SshError::ChannelError(e.to_string()))
    }

    /// Round-trip a keepalive through the transport
    pub async fn ping(&self, timeout: Duration) -> PingResult {
        if !self.is_connected() {
            return PingResult::IoError;
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(HandleCommand::Ping { timeout, reply_tx })
            .await
            .is_err()
        {
            return PingResult::IoError;
        }
        reply_rx.await.unwrap_or(PingResult::IoError)
    }

    /// Ask the owner task to disconnect. Errors are ignored.
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(HandleCommand::Disconnect).await;
    }

    /// Whether the owner task is still running. Says nothing about the network.
    pub fn is_connected(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}

/// Spawn the Handle Owner Task, consuming the handle.
pub fn spawn_handle_owner_task(
    handle: Handle<ClientHandler>,
    connection_id: String,
) -> HandleController {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<HandleCommand>(16);

    tokio::spawn(async move {
        let handle = handle;

        info!("Handle owner task started for connection {}", connection_id);

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                HandleCommand::ChannelOpenSession { reply_tx } => {
                    let result = handle.channel_open_session().await;
                    if reply_tx.send(result).is_err() {
                        warn!("Caller dropped before receiving channel_open_session result");
                    }
                }

                HandleCommand::Ping { timeout, reply_tx } => {
                    let result = keepalive(&handle, timeout, &connection_id).await;
                    let _ = reply_tx.send(result);
                }

                HandleCommand::Disconnect => {
                    info!("Disconnect requested for connection {}", connection_id);
                    break;
                }
            }
        }

        drain_pending_commands(&mut cmd_rx);

        let _ = handle
            .disconnect(russh::Disconnect::ByApplication, "Session closed", "en")
            .await;
        info!("Handle owner task terminated for connection {}", connection_id);
    });

    HandleController { cmd_tx }
}

async fn keepalive(
    handle: &Handle<ClientHandler>,
    timeout: Duration,
    connection_id: &str,
) -> PingResult {
    if handle.is_closed() {
        return PingResult::IoError;
    }

    debug!("Sending keepalive on connection {}", connection_id);
    // send_ping resolves once the server answers the global request
    match tokio::time::timeout(timeout, handle.send_ping()).await {
        // The reply slot is also released when the session loop dies
        Ok(Ok(())) if handle.is_closed() => PingResult::IoError,
        Ok(Ok(())) => PingResult::Ok,
        Ok(Err(e)) => {
            warn!("Keepalive failed for connection {}: {}", connection_id, e);
            PingResult::IoError
        }
        Err(_) => {
            warn!(
                "Keepalive timeout for connection {} ({}ms)",
                connection_id,
                timeout.as_millis()
            );
            PingResult::Timeout
        }
    }
}

/// Drain all pending commands, answering each with a disconnect
fn drain_pending_commands(cmd_rx: &mut mpsc::Receiver<HandleCommand>) {
    cmd_rx.close();

    while let Ok(cmd) = cmd_rx.try_recv() {
        match cmd {
            HandleCommand::ChannelOpenSession { reply_tx } => {
                let _ = reply_tx.send(Err(russh::Error::Disconnect));
            }
            HandleCommand::Ping { reply_tx, .. } => {
                let _ = reply_tx.send(PingResult::IoError);
            }
            HandleCommand::Disconnect => {}
        }
    }
}
