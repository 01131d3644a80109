//! Connection commands
//!
//! - `login` - connect, or confirm an existing healthy connection
//! - `disconnect` - drop the connection, keep credentials
//! - `shutdown` - drop the connection and forget credentials

use tracing::warn;

use super::{render_error, render_unit, CONNECTED_NOTE, OK};
use crate::session::{LoginOutcome, SessionManager};
use crate::ssh::Credentials;

/// Parse the port as hosts pass it (text)
pub fn parse_port(port: &str) -> Result<u16, String> {
    port.trim()
        .parse::<u16>()
        .map_err(|_| format!("invalid port: {}", port))
}

pub async fn login(
    manager: &SessionManager,
    host: &str,
    port: &str,
    username: &str,
    password: &str,
) -> String {
    let port = match parse_port(port) {
        Ok(port) => port,
        Err(e) => {
            warn!("Login rejected: {}", e);
            return render_error(e);
        }
    };

    match manager
        .login(Credentials::new(host, port, username, password))
        .await
    {
        Ok(LoginOutcome::Connected) => OK.to_string(),
        Ok(LoginOutcome::AlreadyConnected) => CONNECTED_NOTE.to_string(),
        Err(e) => render_error(e),
    }
}

pub async fn disconnect(manager: &SessionManager) -> String {
    render_unit(manager.disconnect().await)
}

/// Close everything and forget the credentials. Always succeeds.
pub async fn shutdown(manager: &SessionManager) -> String {
    manager.shutdown().await;
    OK.to_string()
}
