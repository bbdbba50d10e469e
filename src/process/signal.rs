//! Termination signal delivery.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use tracing::debug;

use super::probe::to_pid;
use crate::error::{DaemonError, Result};

/// Signal used to stop a daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// SIGTERM, allowing the daemon to shut down cleanly.
    Terminate,
    /// SIGKILL.
    Kill,
}

impl StopSignal {
    fn as_nix(self) -> Signal {
        match self {
            StopSignal::Terminate => Signal::SIGTERM,
            StopSignal::Kill => Signal::SIGKILL,
        }
    }
}

impl std::fmt::Display for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopSignal::Terminate => write!(f, "SIGTERM"),
            StopSignal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Delivers stop signals to daemon processes.
pub trait ProcessSignaller: Send + Sync {
    /// Sends `signal` to `pid`. Returns `Ok(false)` when the process no
    /// longer exists, which callers treat as already terminated.
    fn signal(&self, alias: &str, pid: u32, signal: StopSignal) -> Result<bool>;
}

/// Signaller backed by `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignaller;

impl SystemSignaller {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSignaller for SystemSignaller {
    fn signal(&self, alias: &str, pid: u32, signal: StopSignal) -> Result<bool> {
        let Some(raw) = to_pid(pid) else {
            return Ok(false);
        };

        debug!(alias = alias, pid = pid, signal = %signal, "Sending signal");

        match kill(raw, signal.as_nix()) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(source) => Err(DaemonError::SignalFailed {
                alias: alias.to_string(),
                pid,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_display() {
        assert_eq!(format!("{}", StopSignal::Terminate), "SIGTERM");
        assert_eq!(format!("{}", StopSignal::Kill), "SIGKILL");
    }

    #[test]
    fn test_signal_missing_process_reports_gone() {
        let signaller = SystemSignaller::new();
        assert!(!signaller
            .signal("ghost", 4_000_000, StopSignal::Terminate)
            .unwrap());
        assert!(!signaller.signal("ghost", 0, StopSignal::Kill).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_child() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let signaller = SystemSignaller::new();

        assert!(signaller
            .signal("sleeper", child.id(), StopSignal::Terminate)
            .unwrap());

        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}
