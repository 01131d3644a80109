//! Text command surface
//!
//! Each command drives the `SessionManager` and renders the outcome in the
//! line format hosts expect: `OK`, `NOTE: Connected`, `ERR: <message>`, or a
//! JSON listing.

pub mod sftp;
pub mod ssh;

pub use sftp::*;
pub use ssh::*;

use crate::session::SessionError;

/// Plain success
pub const OK: &str = "OK";

/// Login found a healthy connection and kept it
pub const CONNECTED_NOTE: &str = "NOTE: Connected";

/// Prefix of every failure line
pub const ERR_PREFIX: &str = "ERR: ";

pub(crate) fn render_error(err: impl std::fmt::Display) -> String {
    format!("{}{}", ERR_PREFIX, err)
}

pub(crate) fn render_unit(result: Result<(), SessionError>) -> String {
    match result {
        Ok(()) => OK.to_string(),
        Err(e) => render_error(e),
    }
}
