//! Per-invocation inputs captured at the command-line boundary.

use std::env;
use std::path::PathBuf;

use crate::config::LaunchConfig;
use crate::error::Result;

/// Who is running the command, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Directory explicit targets are resolved against.
    pub working_directory: PathBuf,
    /// Best-effort user name recorded as `startedBy` / `stoppedBy`.
    pub user: Option<String>,
}

impl Invocation {
    pub fn new(working_directory: impl Into<PathBuf>, user: Option<String>) -> Self {
        Self {
            working_directory: working_directory.into(),
            user,
        }
    }

    /// Reads the current directory and invoking user from the process.
    pub fn capture() -> Result<Self> {
        Ok(Self::new(env::current_dir()?, current_user()))
    }
}

fn current_user() -> Option<String> {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|name| !name.is_empty())
        .or_else(|| {
            nix::unistd::User::from_uid(nix::unistd::getuid())
                .ok()
                .flatten()
                .map(|user| user.name)
        })
}

/// How to launch a daemon from an explicit target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Interpreter to run the target with; `None` executes it directly.
    pub runtime: Option<String>,
    /// Flags passed to the runtime before the target.
    pub options: Vec<String>,
    /// Arguments passed to the target.
    pub args: Vec<String>,
    /// Extra environment for the child.
    pub env: Vec<(String, String)>,
    pub inherit_env: bool,
    /// Append output to the alias log instead of discarding it.
    pub capture_output: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from_config(&LaunchConfig::default())
    }
}

impl LaunchOptions {
    /// Builds options from the configured launch defaults.
    pub fn from_config(config: &LaunchConfig) -> Self {
        Self {
            runtime: config.runtime.clone(),
            options: config.options.clone(),
            args: Vec::new(),
            env: config.env_pairs(),
            inherit_env: config.inherit_env,
            capture_output: config.capture_output,
        }
    }

    /// Overrides the runtime when one is given.
    pub fn with_runtime(mut self, runtime: Option<String>) -> Self {
        if runtime.is_some() {
            self.runtime = runtime;
        }
        self
    }

    /// Replaces the runtime flags when any are given.
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        if !options.is_empty() {
            self.options = options;
        }
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}
