//! Command-line interface definition for daemonctl.
//!
//! This module defines the CLI structure using clap derive macros,
//! including all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// daemonctl - Minimal local daemon supervisor
///
/// Starts programs as detached background processes, tracks them by alias,
/// and stops or inspects them later.
#[derive(Debug, Parser)]
#[command(name = "daemonctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "DAEMONCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Registry root directory (overrides configuration)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors, and skip confirmation messages
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level requested by flags, if any.
    /// Returns: (level_name, is_quiet)
    pub fn log_level(&self) -> Option<(&'static str, bool)> {
        if self.quiet {
            return Some(("error", true));
        }

        match self.verbose {
            0 => None,
            1 => Some(("debug", false)),
            _ => Some(("trace", false)),
        }
    }

    /// Whether start/stop/restart should print a confirmation line.
    /// Query commands (`list`, `show`, `status`) always print their result.
    pub fn confirmations(&self) -> bool {
        !self.quiet
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a daemon, or relaunch a recorded one
    Start(StartArgs),

    /// Stop a running daemon
    Stop(AliasArgs),

    /// Stop a daemon and start it again with its recorded settings
    #[command(visible_alias = "reload")]
    Restart(AliasArgs),

    /// List recorded daemons
    List(ListArgs),

    /// Show everything recorded about a daemon
    Show(ShowArgs),

    /// Print the live state of a daemon
    Status(ShowArgs),

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments for the `start` subcommand.
#[derive(Debug, Args)]
pub struct StartArgs {
    /// Daemon alias
    pub alias: String,

    /// Script or executable to run (defaults to the recorded target)
    pub target: Option<PathBuf>,

    /// Interpreter to run the target with
    #[arg(short, long)]
    pub runtime: Option<String>,

    /// Flag passed to the runtime (can be repeated)
    #[arg(short = 'o', long = "option", allow_hyphen_values = true)]
    pub options: Vec<String>,

    /// Arguments passed to the target
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl StartArgs {
    /// Names the launch flags that were given. Without a target these are
    /// ignored, since the daemon is relaunched as recorded.
    pub fn launch_overrides(&self) -> Vec<&'static str> {
        let mut given = Vec::new();
        if self.runtime.is_some() {
            given.push("--runtime");
        }
        if !self.options.is_empty() {
            given.push("--option");
        }
        if !self.args.is_empty() {
            given.push("-- <args>");
        }
        given
    }
}

/// Arguments for subcommands that only take an alias.
#[derive(Debug, Args)]
pub struct AliasArgs {
    /// Daemon alias
    pub alias: String,
}

/// Arguments for the `list` subcommand.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only list aliases matching this glob
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `show` and `status` subcommands.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Daemon alias
    pub alias: String,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration file
    Validate,

    /// Show the current configuration
    Show,
}
