//! Configuration module for daemonctl.
//!
//! This module provides all configuration types and loading functionality.
//! Configuration can be loaded from a YAML file and overridden by
//! environment variables.

mod launch;
mod logging;
mod stop;

pub use launch::LaunchConfig;
pub use logging::{LogFormat, LogLevel, LogOutput, LoggingConfig};
pub use stop::StopConfig;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{DaemonError, Result};

/// Environment variable for the configuration file path.
pub const ENV_CONFIG_PATH: &str = "DAEMONCTL_CONFIG";

/// Environment variable for the registry root directory.
pub const ENV_HOME: &str = "DAEMONCTL_HOME";

/// Registry root directory name under the user's home directory.
pub const DEFAULT_HOME_DIR: &str = ".daemonctl";

/// Configuration file name inside the registry root.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry root directory (defaults to `~/.daemonctl`).
    pub home: Option<PathBuf>,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Launch defaults for new daemons.
    pub launch: LaunchConfig,

    /// Stop behaviour.
    pub stop: StopConfig,
}

impl Config {
    /// Loads configuration with the following priority:
    /// 1. Explicit path (if provided)
    /// 2. DAEMONCTL_CONFIG environment variable
    /// 3. `config.yaml` inside the registry root
    ///
    /// Returns default config if no file exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path);

        if path.exists() {
            let mut config = Self::load_from_path(&path)?;
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        } else if explicit_path.is_some() {
            return Err(DaemonError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let mut config = Config::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DaemonError::config_with_source(
                format!("Failed to read config file: {}", path.display()),
                e,
            )
        })?;

        Self::load_from_str(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| DaemonError::config_with_source("Failed to parse config", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Resolves the configuration file path based on priority.
    fn resolve_config_path(explicit_path: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit_path {
            return path.to_path_buf();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_PATH) {
            return PathBuf::from(env_path);
        }

        let home = env::var_os(ENV_HOME)
            .map(PathBuf::from)
            .unwrap_or_else(default_home);
        home.join(CONFIG_FILE_NAME)
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(home) = env::var_os(ENV_HOME) {
            self.home = Some(PathBuf::from(home));
        }

        if let Ok(level) = env::var("DAEMONCTL_LOG_LEVEL") {
            self.logging.level = level.parse()?;
        }

        if let Ok(format) = env::var("DAEMONCTL_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        if let Ok(runtime) = env::var("DAEMONCTL_RUNTIME") {
            self.launch.runtime = Some(runtime);
        }

        if let Ok(options) = env::var("DAEMONCTL_LAUNCH_OPTIONS") {
            self.launch.options = shell_words::split(&options).map_err(|e| {
                DaemonError::config_with_source("Failed to parse DAEMONCTL_LAUNCH_OPTIONS", e)
            })?;
        }

        Ok(())
    }

    /// Validates configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(home) = &self.home {
            if home.as_os_str().is_empty() {
                return Err(DaemonError::config("home must not be empty"));
            }
        }

        self.logging.validate()?;
        self.launch.validate()?;
        self.stop.validate()?;

        Ok(())
    }

    /// Returns the registry root directory.
    pub fn home_dir(&self) -> PathBuf {
        self.home.clone().unwrap_or_else(default_home)
    }
}

/// Returns `~/.daemonctl`, or a relative `.daemonctl` when no home is known.
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_HOME_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR))
}
