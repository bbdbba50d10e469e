//! Persisted daemon metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::{DaemonError, Result};

/// A JSON object holding a subset of a record's fields.
pub type Projection = serde_json::Map<String, Value>;

/// Longest alias accepted. Aliases are used verbatim as file names, and
/// `<alias>.lock` and `<alias>.log` must still fit in NAME_MAX (255).
const MAX_ALIAS_LEN: usize = 250;

/// Cached run status stored alongside the record.
///
/// This is a hint written at the last transition. Liveness decisions are
/// always re-derived from the PID marker and a process probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Running,
    Stopped,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Running => write!(f, "running"),
            RecordStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Metadata for one supervised daemon, keyed by alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonRecord {
    /// Operator-chosen unique name.
    pub alias: String,
    /// Script or executable to run, as given by the operator.
    pub target_file: PathBuf,
    /// Directory the daemon was launched from.
    pub working_directory: PathBuf,
    /// Flags passed to the runtime, in order.
    #[serde(default)]
    pub launch_options: Vec<String>,
    /// Arguments passed to the target.
    #[serde(default)]
    pub args: Vec<String>,
    /// Runtime binary, or the resolved target when launched directly.
    pub executable_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub started_by: Option<String>,
    pub stopped_by: Option<String>,
    pub status: RecordStatus,
    pub pid: Option<u32>,
}

/// Keeps only `fields` from `source`, in the order the fields were requested.
/// Unknown field names are ignored.
pub fn project(source: &Projection, fields: &[&str]) -> Projection {
    fields
        .iter()
        .filter_map(|field| {
            source
                .get(*field)
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect()
}

/// Checks that an alias is usable as a registry key.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(DaemonError::MissingAlias);
    }
    if alias.len() > MAX_ALIAS_LEN {
        return Err(DaemonError::invalid_alias(
            alias,
            format!("longer than {} bytes", MAX_ALIAS_LEN),
        ));
    }
    if alias.starts_with('.') {
        return Err(DaemonError::invalid_alias(alias, "must not start with '.'"));
    }
    if alias.contains(['/', '\\', '\0']) {
        return Err(DaemonError::invalid_alias(
            alias,
            "must not contain path separators",
        ));
    }
    Ok(())
}

/// Returns true for directory entries that belong to the store's bookkeeping
/// (dotfiles such as `.DS_Store` and in-flight temporary files).
pub(crate) fn is_housekeeping(name: &str) -> bool {
    name.starts_with('.')
}
