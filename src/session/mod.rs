//! Session Management Module
//!
//! One shared transport + file-session pair per `SessionManager`:
//! - Login with idempotent reuse of a healthy connection
//! - Keepalive-based liveness probing before every operation
//! - A single transparent reconnect with the stored credentials
//! - Strict serialization of callers behind one async mutex

pub mod error;
pub mod liveness;
pub mod manager;

pub use error::{ErrorCategory, SessionError};
pub use liveness::LivenessProber;
pub use manager::{ConnectionPair, LoginOutcome, SessionManager, SessionStatus};
