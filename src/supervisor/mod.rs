//! Daemon supervisor - the lifecycle state machine.
//!
//! The supervisor composes the registry store with the process probe,
//! launcher and signaller. Every operation re-derives the live state of an
//! alias from its PID marker, its record and the probe; the cached `status`
//! field of a record is never trusted on its own.
//!
//! Mutating operations (`start`, `stop`, `restart`) hold the per-alias lock
//! and derive the state again once they own it, so two racing invocations
//! on the same alias cannot both spawn.

mod context;
mod state;


pub use context::{Invocation, LaunchOptions};
pub use state::{
    DaemonDetails, DaemonState, DaemonStatus, DaemonSummary, RestartReport, StartOutcome,
    StartReport, StopOutcome, StopReport,
};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, StopConfig};
use crate::error::{DaemonError, Result};
use crate::process::{
    DetachedLauncher, OutputTarget, ProcessLauncher, ProcessProbe, ProcessSignaller,
    SpawnRequest, StopSignal, SystemProbe, SystemSignaller,
};
use crate::registry::{validate_alias, DaemonRecord, Projection, RecordStatus, RegistryStore};

/// Record fields needed to build a `list` row.
const LIST_FIELDS: &[&str] = &["alias", "status", "pid", "workingDirectory", "startedAt"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry {
    alias: String,
    status: RecordStatus,
    pid: Option<u32>,
    working_directory: PathBuf,
    started_at: DateTime<Utc>,
}

/// Record fields that carry a claim about liveness.
const CLAIM_FIELDS: &[&str] = &["status", "pid"];

#[derive(Debug, Deserialize)]
struct Claim {
    status: RecordStatus,
    pid: Option<u32>,
}

/// The recorded claim about an alias: cached status and last known PID.
type Recorded = Option<(RecordStatus, Option<u32>)>;

fn recorded(record: Option<&DaemonRecord>) -> Recorded {
    record.map(|record| (record.status, record.pid))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Derived {
    state: DaemonState,
    pid: Option<u32>,
}

/// What to execute for one alias.
#[derive(Debug, Clone)]
struct LaunchPlan {
    target_file: PathBuf,
    working_directory: PathBuf,
    executable_path: PathBuf,
    launch_options: Vec<String>,
    args: Vec<String>,
}

impl LaunchPlan {
    fn from_target(target: &Path, invocation: &Invocation, options: &LaunchOptions) -> Self {
        let working_directory = invocation.working_directory.clone();
        let (executable_path, launch_options) = match &options.runtime {
            Some(runtime) => (PathBuf::from(runtime), options.options.clone()),
            None => (working_directory.join(target), Vec::new()),
        };

        Self {
            target_file: target.to_path_buf(),
            working_directory,
            executable_path,
            launch_options,
            args: options.args.clone(),
        }
    }

    fn from_record(record: &DaemonRecord) -> Self {
        Self {
            target_file: record.target_file.clone(),
            working_directory: record.working_directory.clone(),
            executable_path: record.executable_path.clone(),
            launch_options: record.launch_options.clone(),
            args: record.args.clone(),
        }
    }

    fn resolved_target(&self) -> PathBuf {
        self.working_directory.join(&self.target_file)
    }

    fn check_target(&self) -> Result<()> {
        let path = self.resolved_target();
        if !path.exists() {
            return Err(DaemonError::TargetNotFound { path });
        }
        Ok(())
    }

    /// Argument vector after the program: runtime flags, the target, then
    /// the target's own arguments. A direct launch gets only the latter.
    fn command_args(&self) -> Vec<String> {
        let target = self.resolved_target();
        if self.executable_path == target {
            return self.args.clone();
        }

        let mut args = self.launch_options.clone();
        args.push(target.to_string_lossy().into_owned());
        args.extend(self.args.iter().cloned());
        args
    }
}

/// Supervises daemons recorded in one registry.
#[derive(Clone)]
pub struct Supervisor {
    store: RegistryStore,
    probe: Arc<dyn ProcessProbe>,
    launcher: Arc<dyn ProcessLauncher>,
    signaller: Arc<dyn ProcessSignaller>,
    stop: StopConfig,
    invocation: Invocation,
}

impl Supervisor {
    /// Creates a supervisor backed by the real OS, rooted at the configured home.
    pub fn from_config(config: &Config, invocation: Invocation) -> Self {
        Self::with_components(
            RegistryStore::new(config.home_dir()),
            Arc::new(SystemProbe::new()),
            Arc::new(DetachedLauncher::new()),
            Arc::new(SystemSignaller::new()),
            config.stop.clone(),
            invocation,
        )
    }

    /// Creates a supervisor from explicit components.
    pub fn with_components(
        store: RegistryStore,
        probe: Arc<dyn ProcessProbe>,
        launcher: Arc<dyn ProcessLauncher>,
        signaller: Arc<dyn ProcessSignaller>,
        stop: StopConfig,
        invocation: Invocation,
    ) -> Self {
        Self {
            store,
            probe,
            launcher,
            signaller,
            stop,
            invocation,
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Starts a daemon under `alias`.
    ///
    /// Without a `target` the daemon is relaunched exactly as recorded.
    /// A live daemon is left alone; a daemon that died without being stopped
    /// is replaced.
    pub async fn start(
        &self,
        alias: &str,
        target: Option<&Path>,
        options: &LaunchOptions,
    ) -> Result<StartReport> {
        validate_alias(alias)?;

        let target = target.filter(|target| !target.as_os_str().is_empty());
        let plan = match target {
            Some(target) => LaunchPlan::from_target(target, &self.invocation, options),
            None => match self.load_record(alias)? {
                Some(record) => LaunchPlan::from_record(&record),
                None => {
                    return Err(DaemonError::MissingTarget {
                        alias: alias.to_string(),
                    })
                }
            },
        };
        plan.check_target()?;

        let _lock = self.store.lock(alias)?;
        self.start_locked(alias, &plan, options).await
    }

    /// Stops a daemon. Stopping a daemon that is not running succeeds
    /// without sending any signal.
    pub async fn stop(&self, alias: &str) -> Result<StopReport> {
        validate_alias(alias)?;

        let derived = self.derive(alias)?;
        if matches!(derived.state, DaemonState::Unknown | DaemonState::Stopped) {
            debug!(alias = alias, state = %derived.state, "Daemon is not running");
            return Ok(StopReport {
                alias: alias.to_string(),
                outcome: StopOutcome::AlreadyStopped,
                pid: derived.pid,
            });
        }

        let _lock = self.store.lock(alias)?;
        self.stop_locked(alias).await
    }

    /// Stops then starts a recorded daemon with its recorded settings.
    pub async fn restart(&self, alias: &str, options: &LaunchOptions) -> Result<RestartReport> {
        validate_alias(alias)?;

        let record = self.store.get(alias)?;
        let plan = LaunchPlan::from_record(&record);
        plan.check_target()?;

        let _lock = self.store.lock(alias)?;
        let stopped = self.stop_locked(alias).await?;
        let started = self.start_locked(alias, &plan, options).await?;

        info!(alias = alias, pid = started.pid, "Daemon restarted");

        Ok(RestartReport {
            alias: alias.to_string(),
            stop: stopped.outcome,
            start: started.outcome,
            pid: started.pid,
        })
    }

    /// Returns the live state of an alias. Unrecorded aliases are `Unknown`.
    pub async fn status(&self, alias: &str) -> Result<DaemonStatus> {
        validate_alias(alias)?;

        let derived = self.derive(alias)?;
        Ok(DaemonStatus {
            alias: alias.to_string(),
            state: derived.state,
            pid: derived.pid,
        })
    }

    /// Lists every recorded daemon with its live state, sorted by alias.
    /// `filter` is a glob matched against aliases.
    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<DaemonSummary>> {
        let mut summaries = Vec::new();

        for entry in self.store.list(Some(LIST_FIELDS))? {
            let entry: ListEntry = match serde_json::from_value(Value::Object(entry)) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping incomplete record");
                    continue;
                }
            };

            if let Some(pattern) = filter {
                if !glob_match::glob_match(pattern, &entry.alias) {
                    continue;
                }
            }

            let derived = self.reconcile(&entry.alias, Some((entry.status, entry.pid)))?;
            summaries.push(DaemonSummary {
                alias: entry.alias,
                status: derived.state,
                working_directory: entry.working_directory,
                started_at: entry.started_at,
                pid: derived.pid,
            });
        }

        summaries.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(summaries)
    }

    /// Returns the full record for an alias with its live state.
    pub async fn show(&self, alias: &str) -> Result<DaemonDetails> {
        validate_alias(alias)?;

        let record = self.store.get(alias)?;
        let derived = self.reconcile(alias, recorded(Some(&record)))?;

        Ok(DaemonDetails {
            record,
            live_status: derived.state,
        })
    }

    async fn start_locked(
        &self,
        alias: &str,
        plan: &LaunchPlan,
        options: &LaunchOptions,
    ) -> Result<StartReport> {
        let derived = self.derive(alias)?;

        if let (DaemonState::Running, Some(pid)) = (derived.state, derived.pid) {
            info!(alias = alias, pid = pid, "Daemon is already running");
            return Ok(StartReport {
                alias: alias.to_string(),
                outcome: StartOutcome::AlreadyRunning,
                pid,
            });
        }

        let outcome = if derived.state == DaemonState::StaleRunning {
            warn!(alias = alias, pid = ?derived.pid, "Daemon was stopped externally, restarting");
            StartOutcome::Restarted
        } else {
            StartOutcome::Started
        };

        let output = if options.capture_output {
            OutputTarget::Append(self.store.log_path(alias))
        } else {
            OutputTarget::Discard
        };

        let request = SpawnRequest {
            alias: alias.to_string(),
            program: plan.executable_path.clone(),
            args: plan.command_args(),
            working_directory: plan.working_directory.clone(),
            env: options.env.clone(),
            inherit_env: options.inherit_env,
            output,
        };

        let pid = self.launcher.spawn(&request).await?;

        self.store.write_pid_marker(alias, pid)?;
        self.store.put(&DaemonRecord {
            alias: alias.to_string(),
            target_file: plan.target_file.clone(),
            working_directory: plan.working_directory.clone(),
            launch_options: plan.launch_options.clone(),
            args: plan.args.clone(),
            executable_path: plan.executable_path.clone(),
            started_at: Utc::now(),
            stopped_at: None,
            started_by: self.invocation.user.clone(),
            stopped_by: None,
            status: RecordStatus::Running,
            pid: Some(pid),
        })?;

        info!(alias = alias, pid = pid, outcome = %outcome, "Daemon started");

        Ok(StartReport {
            alias: alias.to_string(),
            outcome,
            pid,
        })
    }

    async fn stop_locked(&self, alias: &str) -> Result<StopReport> {
        let record = self.load_record(alias)?;
        let derived = self.reconcile(alias, recorded(record.as_ref()))?;

        let outcome = match (derived.state, derived.pid) {
            (DaemonState::Running, Some(pid)) => {
                if self.terminate(alias, pid).await? {
                    StopOutcome::Stopped
                } else {
                    StopOutcome::AlreadyStopped
                }
            }
            (DaemonState::StaleRunning, _) => {
                info!(alias = alias, pid = ?derived.pid, "Daemon already exited, clearing stale state");
                StopOutcome::AlreadyStopped
            }
            _ => {
                return Ok(StopReport {
                    alias: alias.to_string(),
                    outcome: StopOutcome::AlreadyStopped,
                    pid: derived.pid,
                })
            }
        };

        self.store.delete_pid_marker(alias)?;

        let needs_update = record.as_ref().is_some_and(|record| {
            record.status == RecordStatus::Running || outcome == StopOutcome::Stopped
        });
        if needs_update {
            self.mark_stopped(alias)?;
        }

        if outcome == StopOutcome::Stopped {
            info!(alias = alias, pid = ?derived.pid, "Daemon stopped");
        }

        Ok(StopReport {
            alias: alias.to_string(),
            outcome,
            pid: derived.pid,
        })
    }

    /// Sends SIGTERM and waits for the process to exit, escalating to
    /// SIGKILL when configured. Returns `false` if the process was already
    /// gone when signalled.
    async fn terminate(&self, alias: &str, pid: u32) -> Result<bool> {
        if !self.signaller.signal(alias, pid, StopSignal::Terminate)? {
            return Ok(false);
        }
        if self.wait_for_exit(pid).await? {
            return Ok(true);
        }

        if self.stop.force_kill {
            warn!(
                alias = alias,
                pid = pid,
                timeout_secs = self.stop.timeout_secs,
                "Daemon did not exit after SIGTERM, sending SIGKILL"
            );
            if !self.signaller.signal(alias, pid, StopSignal::Kill)? {
                return Ok(true);
            }
            if self.wait_for_exit(pid).await? {
                return Ok(true);
            }
        }

        Err(DaemonError::Timeout {
            operation: format!("waiting for '{}' (PID {}) to exit", alias, pid),
            seconds: self.stop.timeout_secs,
        })
    }

    async fn wait_for_exit(&self, pid: u32) -> Result<bool> {
        // None waits until the process exits.
        let deadline = Instant::now().checked_add(self.stop.timeout());

        loop {
            if !self.probe.is_alive(pid)? {
                return Ok(true);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(false);
            }
            tokio::time::sleep(self.stop.poll_interval()).await;
        }
    }

    fn mark_stopped(&self, alias: &str) -> Result<()> {
        let mut patch = Projection::new();
        patch.insert("status".to_string(), json!(RecordStatus::Stopped));
        patch.insert("stoppedAt".to_string(), json!(Utc::now()));
        patch.insert("stoppedBy".to_string(), json!(self.invocation.user));

        self.store.merge(alias, patch)?;
        Ok(())
    }

    fn derive(&self, alias: &str) -> Result<Derived> {
        let claim = match self.store.project(alias, CLAIM_FIELDS) {
            Ok(fields) => {
                let claim: Claim = serde_json::from_value(Value::Object(fields))?;
                Some((claim.status, claim.pid))
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        self.reconcile(alias, claim)
    }

    /// Resolves the live state from the marker, the recorded claim and the
    /// probe. Reads only.
    fn reconcile(&self, alias: &str, recorded: Recorded) -> Result<Derived> {
        let marker = self.load_marker(alias)?;
        let claims_running =
            marker.is_some() || matches!(recorded, Some((RecordStatus::Running, _)));
        let pid = marker.or(recorded.and_then(|(_, pid)| pid));

        let state = match (claims_running, pid) {
            (false, _) if recorded.is_some() => DaemonState::Stopped,
            (false, _) => DaemonState::Unknown,
            (true, Some(pid)) if self.probe.is_alive(pid)? => DaemonState::Running,
            (true, _) => DaemonState::StaleRunning,
        };

        debug!(alias = alias, state = %state, pid = ?pid, "Derived daemon state");
        Ok(Derived { state, pid })
    }

    fn load_record(&self, alias: &str) -> Result<Option<DaemonRecord>> {
        match self.store.get(alias) {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn load_marker(&self, alias: &str) -> Result<Option<u32>> {
        if !self.store.has_pid_marker(alias) {
            return Ok(None);
        }

        match self.store.read_pid_marker(alias) {
            Ok(pid) => Ok(Some(pid)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(DaemonError::InvalidMarker { content, .. }) => {
                warn!(alias = alias, content = %content.trim(), "Ignoring unreadable PID marker");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
