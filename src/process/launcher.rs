//! Detached process launcher.
//!
//! Daemons are started in their own session with stdin closed, so they are
//! not tied to the invoking terminal and keep running after the CLI exits.

use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{DaemonError, Result};

/// Where a daemon's stdout and stderr go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Both streams go to the null device.
    Discard,
    /// Both streams are appended to this file.
    Append(PathBuf),
}

/// Everything needed to start one daemon process.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// Alias the process is started for (used in errors and logs).
    pub alias: String,
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// Working directory of the new process.
    pub working_directory: PathBuf,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Whether the invoking environment is passed through.
    pub inherit_env: bool,
    pub output: OutputTarget,
}

/// Starts daemon processes.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Starts the process and returns its PID once the OS has created it.
    async fn spawn(&self, request: &SpawnRequest) -> Result<u32>;
}

/// Launcher that detaches children into a new session.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedLauncher;

impl DetachedLauncher {
    pub fn new() -> Self {
        Self
    }

    fn output_stdio(request: &SpawnRequest) -> std::io::Result<(Stdio, Stdio)> {
        match &request.output {
            OutputTarget::Discard => Ok((Stdio::null(), Stdio::null())),
            OutputTarget::Append(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let stderr = file.try_clone()?;
                Ok((Stdio::from(file), Stdio::from(stderr)))
            }
        }
    }
}

#[async_trait]
impl ProcessLauncher for DetachedLauncher {
    async fn spawn(&self, request: &SpawnRequest) -> Result<u32> {
        let spawn_err = |source: std::io::Error| DaemonError::SpawnFailed {
            alias: request.alias.clone(),
            source,
        };

        debug!(
            alias = %request.alias,
            program = %request.program.display(),
            args = ?request.args,
            cwd = %request.working_directory.display(),
            "Spawning daemon"
        );

        let (stdout, stderr) = Self::output_stdio(request).map_err(spawn_err)?;

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .current_dir(&request.working_directory)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(false);

        if !request.inherit_env {
            cmd.env_clear();
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        // SAFETY: runs in the forked child before exec and only calls
        // setsid(2), which is async-signal-safe.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid()
                    .map(|_| ())
                    .map_err(std::io::Error::from)
            });
        }

        let child = cmd.spawn().map_err(spawn_err)?;
        let pid = child.id().ok_or_else(|| {
            spawn_err(std::io::Error::other("process exited before its PID was read"))
        })?;

        info!(alias = %request.alias, pid = pid, "Spawned daemon");

        // Dropping the handle leaves the daemon running; it is not waited on.
        drop(child);
        Ok(pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessProbe, SystemProbe};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn request(program: &str, args: &[&str], cwd: PathBuf) -> SpawnRequest {
        SpawnRequest {
            alias: "test".to_string(),
            program: PathBuf::from(program),
            args: args.iter().map(|s| s.to_string()).collect(),
            working_directory: cwd,
            env: Vec::new(),
            inherit_env: true,
            output: OutputTarget::Discard,
        }
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        let dir = tempdir().unwrap();
        let launcher = DetachedLauncher::new();

        let err = launcher
            .spawn(&request("/nonexistent/daemon", &[], dir.path().to_path_buf()))
            .await
            .unwrap_err();

        assert!(matches!(err, DaemonError::SpawnFailed { ref alias, .. } if alias == "test"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_spawn_runs_detached_in_new_session() {
        let dir = tempdir().unwrap();
        let launcher = DetachedLauncher::new();

        let pid = launcher
            .spawn(&request("sleep", &["30"], dir.path().to_path_buf()))
            .await
            .unwrap();

        assert!(SystemProbe::new().is_alive(pid).unwrap());
        let sid = nix::unistd::getsid(Some(nix::unistd::Pid::from_raw(pid as i32))).unwrap();
        assert_eq!(sid.as_raw(), pid as i32);

        nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGKILL,
        )
        .unwrap();
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_spawn_appends_output_and_sets_env() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("logs").join("test.log");
        let launcher = DetachedLauncher::new();

        let mut req = request(
            "sh",
            &["-c", "echo \"$GREETING from $(pwd)\""],
            dir.path().to_path_buf(),
        );
        req.env = vec![("GREETING".to_string(), "hello".to_string())];
        req.output = OutputTarget::Append(log.clone());

        let pid = launcher.spawn(&req).await.unwrap();

        let probe = SystemProbe::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while probe.is_alive(pid).unwrap() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.starts_with("hello from "));
    }
}
