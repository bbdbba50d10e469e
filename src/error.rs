//! Error types and error handling for daemonctl.
//!
//! This module defines all error types used throughout the application,
//! including stable error codes and CLI exit codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes.
/// Each error has a unique code for identification in logs and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// E001: Configuration file is invalid
    #[serde(rename = "E001")]
    ConfigInvalid,

    /// E002: Daemon record or marker does not exist
    #[serde(rename = "E002")]
    NotFound,

    /// E003: Target file does not exist
    #[serde(rename = "E003")]
    TargetNotFound,

    /// E004: Required argument is missing or malformed
    #[serde(rename = "E004")]
    InvalidArgument,

    /// E005: The OS refused to create the process
    #[serde(rename = "E005")]
    SpawnFailed,

    /// E006: The OS process query failed
    #[serde(rename = "E006")]
    ProbeInconclusive,

    /// E007: Signal delivery failed
    #[serde(rename = "E007")]
    SignalFailed,

    /// E008: Operation timed out
    #[serde(rename = "E008")]
    Timeout,

    /// E009: Registry storage failed
    #[serde(rename = "E009")]
    StoreError,
}

impl ErrorCode {
    /// Returns the error code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "E001",
            ErrorCode::NotFound => "E002",
            ErrorCode::TargetNotFound => "E003",
            ErrorCode::InvalidArgument => "E004",
            ErrorCode::SpawnFailed => "E005",
            ErrorCode::ProbeInconclusive => "E006",
            ErrorCode::SignalFailed => "E007",
            ErrorCode::Timeout => "E008",
            ErrorCode::StoreError => "E009",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CLI exit codes.
pub mod exit_code {
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 2;
    /// Daemon or target not found
    pub const NOT_FOUND: i32 = 3;
    /// Timeout error
    pub const TIMEOUT_ERROR: i32 = 4;
    /// Process control (spawn, probe, signal) error
    pub const PROCESS_ERROR: i32 = 5;
    /// Command line argument error
    pub const CLI_ERROR: i32 = 64;
}

/// The main error type for daemonctl.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration file is invalid or cannot be loaded.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No record or marker exists for the alias.
    #[error("Daemon not found: {alias}")]
    NotFound { alias: String },

    /// The target file to launch does not exist.
    #[error("Target file not found: {}", path.display())]
    TargetNotFound { path: PathBuf },

    /// The alias argument was empty.
    #[error("Please provide the alias name")]
    MissingAlias,

    /// No target file was given and none is recorded for the alias.
    #[error("Please provide the target file for '{alias}'")]
    MissingTarget { alias: String },

    /// The alias cannot be used as a registry key.
    #[error("Invalid alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },

    /// The OS refused to create the process.
    #[error("Failed to spawn daemon '{alias}': {source}")]
    SpawnFailed {
        alias: String,
        #[source]
        source: std::io::Error,
    },

    /// The OS process query failed for a reason other than "no such process".
    #[error("Could not determine whether PID {pid} is alive: {source}")]
    ProbeInconclusive {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    /// Signal delivery failed.
    #[error("Failed to signal daemon '{alias}' (PID {pid}): {source}")]
    SignalFailed {
        alias: String,
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    /// Operation timed out.
    #[error("Timeout: {operation} (waited {seconds}s)")]
    Timeout { operation: String, seconds: u64 },

    /// The per-alias lock could not be acquired.
    #[error("Failed to lock daemon '{alias}': {source}")]
    Lock {
        alias: String,
        #[source]
        source: std::io::Error,
    },

    /// The PID marker holds something other than a PID.
    #[error("Invalid PID marker for '{alias}': {content:?}")]
    InvalidMarker { alias: String, content: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DaemonError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DaemonError::Config { .. } | DaemonError::Yaml(_) => ErrorCode::ConfigInvalid,
            DaemonError::NotFound { .. } => ErrorCode::NotFound,
            DaemonError::TargetNotFound { .. } => ErrorCode::TargetNotFound,
            DaemonError::MissingAlias
            | DaemonError::MissingTarget { .. }
            | DaemonError::InvalidAlias { .. } => ErrorCode::InvalidArgument,
            DaemonError::SpawnFailed { .. } => ErrorCode::SpawnFailed,
            DaemonError::ProbeInconclusive { .. } => ErrorCode::ProbeInconclusive,
            DaemonError::SignalFailed { .. } => ErrorCode::SignalFailed,
            DaemonError::Timeout { .. } => ErrorCode::Timeout,
            DaemonError::Lock { .. }
            | DaemonError::InvalidMarker { .. }
            | DaemonError::Io(_)
            | DaemonError::Json(_) => ErrorCode::StoreError,
        }
    }

    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::Config { .. } | DaemonError::Yaml(_) => exit_code::CONFIG_ERROR,
            DaemonError::NotFound { .. } | DaemonError::TargetNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            DaemonError::MissingAlias
            | DaemonError::MissingTarget { .. }
            | DaemonError::InvalidAlias { .. } => exit_code::CLI_ERROR,
            DaemonError::Timeout { .. } => exit_code::TIMEOUT_ERROR,
            DaemonError::SpawnFailed { .. }
            | DaemonError::ProbeInconclusive { .. }
            | DaemonError::SignalFailed { .. } => exit_code::PROCESS_ERROR,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Returns true for the "nothing recorded" family of errors.
    pub fn is_not_found(&self) -> bool {
        match self {
            DaemonError::NotFound { .. } => true,
            DaemonError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Creates a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        DaemonError::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error with a message and source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DaemonError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a not-found error for an alias.
    pub fn not_found(alias: impl Into<String>) -> Self {
        DaemonError::NotFound {
            alias: alias.into(),
        }
    }

    /// Creates an invalid alias error.
    pub fn invalid_alias(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        DaemonError::InvalidAlias {
            alias: alias.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for daemonctl operations.
pub type Result<T> = std::result::Result<T, DaemonError>;
