//! Launch defaults for new daemons.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DaemonError, Result};

/// Launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// Interpreter used to run the target (e.g. `node`, `python3`).
    /// When unset the target file is executed directly.
    pub runtime: Option<String>,

    /// Flags passed to the runtime before the target file.
    pub options: Vec<String>,

    /// Extra environment variables, as `KEY=VALUE`.
    pub env: Vec<String>,

    /// Whether the daemon inherits the invoking environment.
    pub inherit_env: bool,

    /// Append daemon stdout/stderr to `logs/<alias>.log` instead of discarding it.
    pub capture_output: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            runtime: None,
            options: Vec::new(),
            env: Vec::new(),
            inherit_env: true,
            capture_output: false,
        }
    }
}

impl LaunchConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(runtime) = &self.runtime {
            if runtime.trim().is_empty() {
                return Err(DaemonError::config("launch.runtime must not be empty"));
            }
        }
        Ok(())
    }

    /// Parses `env` into key/value pairs, skipping malformed entries.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter_map(|entry| match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    Some((key.to_string(), value.to_string()))
                }
                _ => {
                    warn!(
                        env_var = entry.as_str(),
                        "Invalid environment variable format, expected KEY=VALUE"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_config_default() {
        let config = LaunchConfig::default();
        assert!(config.runtime.is_none());
        assert!(config.options.is_empty());
        assert!(config.env.is_empty());
        assert!(config.inherit_env);
        assert!(!config.capture_output);
    }

    #[test]
    fn test_env_pairs_skips_invalid_entries() {
        let config = LaunchConfig {
            env: vec![
                "PORT=8080".to_string(),
                "BROKEN".to_string(),
                "=nokey".to_string(),
                "URL=http://host/?a=b".to_string(),
            ],
            ..Default::default()
        };

        assert_eq!(
            config.env_pairs(),
            vec![
                ("PORT".to_string(), "8080".to_string()),
                ("URL".to_string(), "http://host/?a=b".to_string()),
            ]
        );
    }
}
