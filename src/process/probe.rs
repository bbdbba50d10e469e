//! Process liveness probe.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::trace;

use crate::error::{DaemonError, Result};

/// Answers whether a PID currently belongs to a live process.
///
/// "No such process" is the normal `Ok(false)` outcome. Only failures that
/// leave the answer unknown are errors.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> Result<bool>;
}

/// Probe backed by `kill(pid, 0)`.
///
/// A PID that was recycled for an unrelated process owned by the same user
/// is reported alive; the probe carries no process identity beyond the PID.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> Result<bool> {
        let Some(raw) = to_pid(pid) else {
            return Ok(false);
        };

        match kill(raw, None) {
            Ok(()) => {
                let alive = !is_zombie(pid);
                trace!(pid = pid, alive = alive, "Probed process");
                Ok(alive)
            }
            Err(Errno::ESRCH) => {
                trace!(pid = pid, "No such process");
                Ok(false)
            }
            Err(source) => Err(DaemonError::ProbeInconclusive { pid, source }),
        }
    }
}

/// Converts to a signalable PID. 0 and values outside the positive `pid_t`
/// range address process groups or nothing at all.
pub(crate) fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
}

/// Whether the process has exited and is waiting to be reaped.
#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    // The command name is parenthesised and may itself contain ')'.
    stat.rfind(')')
        .and_then(|end| stat[end + 1..].split_whitespace().next())
        .is_some_and(|state| state == "Z")
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}
