//! Logging configuration types.
//!
//! Diagnostics go to stderr by default so that tables and `--json` output on
//! stdout stay machine-readable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{DaemonError, Result};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when neither `-v`/`-q` nor `RUST_LOG` says otherwise.
    pub level: LogLevel,

    pub format: LogFormat,

    pub output: LogOutput,

    /// Append target when `output` is `file`.
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file_path: None,
        }
    }
}

impl LoggingConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.output == LogOutput::File && self.file_path.is_none() {
            return Err(DaemonError::config(
                "logging.file_path is required when output is file",
            ));
        }
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every probe and registry access.
    Trace,
    /// Derived states and lock traffic.
    Debug,
    /// Lifecycle transitions: started, stopped, restarted.
    #[default]
    Info,
    /// Recoverable oddities such as stale markers or skipped records.
    Warn,
    /// Failed commands only.
    Error,
}

impl FromStr for LogLevel {
    type Err = DaemonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DaemonError::config(format!("Unknown log level: {}", s))),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = DaemonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            _ => Err(DaemonError::config(format!("Unknown log format: {}", s))),
        }
    }
}

/// Log output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output, interleaved with command results.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// Appended to `file_path`.
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.file_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = LoggingConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.file_path = Some(PathBuf::from("/tmp/daemonctl.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_output_from_yaml() {
        let config: LoggingConfig =
            serde_yaml::from_str("output: file\nfile_path: /var/log/daemonctl.log\n").unwrap();
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(
            config.file_path,
            Some(PathBuf::from("/var/log/daemonctl.log"))
        );
    }

    #[test]
    fn test_log_level_to_tracing() {
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }
}
