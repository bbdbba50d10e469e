//! Derived daemon states and operation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::registry::DaemonRecord;

/// Live state of a daemon, derived from the record, the PID marker and a
/// process probe. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// Nothing is recorded for the alias.
    Unknown,
    /// The recorded PID belongs to a live process.
    Running,
    /// Recorded as running, but the process is gone.
    #[serde(rename = "stale")]
    StaleRunning,
    /// Recorded as stopped.
    Stopped,
}

impl DaemonState {
    /// Whether a live process backs this state.
    pub fn is_running(&self) -> bool {
        matches!(self, DaemonState::Running)
    }
}

impl std::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonState::Unknown => write!(f, "unknown"),
            DaemonState::Running => write!(f, "running"),
            DaemonState::StaleRunning => write!(f, "stale"),
            DaemonState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Result of `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub alias: String,
    pub state: DaemonState,
    /// The PID that was probed, if any.
    pub pid: Option<u32>,
}

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new process was spawned.
    Started,
    /// A live process already existed; nothing was spawned.
    AlreadyRunning,
    /// The recorded process had died without being stopped and was
    /// replaced by a new one.
    Restarted,
}

impl std::fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartOutcome::Started => write!(f, "started"),
            StartOutcome::AlreadyRunning => write!(f, "already running"),
            StartOutcome::Restarted => write!(f, "restarted"),
        }
    }
}

/// Result of `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReport {
    pub alias: String,
    pub outcome: StartOutcome,
    /// PID of the live process after the call.
    pub pid: u32,
}

/// What `stop` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The live process was signalled and has exited.
    Stopped,
    /// No live process existed; no signal was sent.
    AlreadyStopped,
}

impl std::fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopOutcome::Stopped => write!(f, "stopped"),
            StopOutcome::AlreadyStopped => write!(f, "already stopped"),
        }
    }
}

/// Result of `stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopReport {
    pub alias: String,
    pub outcome: StopOutcome,
    /// PID that was signalled or found dead.
    pub pid: Option<u32>,
}

/// Result of `restart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartReport {
    pub alias: String,
    pub stop: StopOutcome,
    pub start: StartOutcome,
    pub pid: u32,
}

/// One row of `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSummary {
    pub alias: String,
    pub status: DaemonState,
    pub working_directory: PathBuf,
    pub started_at: DateTime<Utc>,
    pub pid: Option<u32>,
}

/// Result of `show`: the stored record plus its live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonDetails {
    #[serde(flatten)]
    pub record: DaemonRecord,
    pub live_status: DaemonState,
}
