//! daemonctl - Minimal local daemon supervisor
//!
//! This crate launches programs as detached background processes, tracks
//! them by alias in a file-backed registry, and reconciles the registry
//! against live OS process state on every command.
//!
//! # Overview
//!
//! Each command is a short-lived invocation. Nothing stays resident between
//! invocations: the registry under `~/.daemonctl` is the only shared state,
//! and per-alias file locks keep racing invocations from double-spawning.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Configuration file parsing and validation
//! - [`error`] - Error types and error handling
//! - [`output`] - Table and message rendering
//! - [`process`] - Liveness probe, signaller and detached launcher
//! - [`registry`] - Durable daemon records and PID markers
//! - [`supervisor`] - The daemon lifecycle state machine

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod process;
pub mod registry;
pub mod supervisor;

// Re-exports for convenience
pub use cli::Cli;
pub use config::Config;
pub use error::{DaemonError, ErrorCode, Result};
pub use registry::RegistryStore;
pub use supervisor::Supervisor;
