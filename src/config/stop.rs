//! Stop and termination-wait configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DaemonError, Result};

/// Upper bound for `timeout_secs`: one day.
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Stop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StopConfig {
    /// How long to wait for a signalled daemon to exit, in seconds.
    pub timeout_secs: u64,

    /// Interval between liveness checks while waiting, in milliseconds.
    pub poll_interval_ms: u64,

    /// Send SIGKILL once the timeout elapses.
    pub force_kill: bool,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            poll_interval_ms: 100,
            force_kill: false,
        }
    }
}

impl StopConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(DaemonError::config("stop.timeout_secs must be > 0"));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(DaemonError::config(format!(
                "stop.timeout_secs must be at most {}",
                MAX_TIMEOUT_SECS
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(DaemonError::config("stop.poll_interval_ms must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
