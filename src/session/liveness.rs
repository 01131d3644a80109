//! Liveness probe
//!
//! Decides whether an existing transport can still carry traffic by
//! round-tripping an SSH keepalive. Anything short of an acknowledgement
//! within the deadline counts as dead.

use std::time::Duration;

use tracing::{debug, warn};

use crate::ssh::{PingResult, Transport};

#[derive(Debug, Clone, Copy)]
pub struct LivenessProber {
    timeout: Duration,
}

impl LivenessProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// True only for an acknowledged keepalive. Never errors.
    pub async fn is_usable(&self, transport: &dyn Transport) -> bool {
        match transport.keepalive(self.timeout).await {
            PingResult::Ok => {
                debug!("Transport {} answered keepalive", transport.id());
                true
            }
            PingResult::Timeout => {
                warn!(
                    "Transport {} did not answer keepalive within {:?}",
                    transport.id(),
                    self.timeout
                );
                false
            }
            PingResult::IoError => {
                warn!("Transport {} is gone", transport.id());
                false
            }
        }
    }
}

impl Default for LivenessProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
