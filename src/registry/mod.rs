//! Registry store - durable per-alias daemon metadata.
//!
//! The store is a directory tree:
//!
//! - `apps/<alias>`: JSON-serialized [`DaemonRecord`]
//! - `pids/<alias>`: the last spawned PID as decimal text
//! - `locks/<alias>.lock`: advisory lock files
//! - `logs/<alias>.log`: captured daemon output
//!
//! Records and PID markers are separate namespaces and may diverge; callers
//! reconcile them against live process state. Writes go through a temporary
//! file renamed into place, so a reader never observes a torn record.

mod lock;
mod record;

pub use lock::AliasLock;
pub use record::{project, validate_alias, DaemonRecord, Projection, RecordStatus};

use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{DaemonError, Result};

const APPS_DIR: &str = "apps";
const PIDS_DIR: &str = "pids";
const LOCKS_DIR: &str = "locks";
const LOGS_DIR: &str = "logs";

/// File-backed registry of daemon records and PID markers.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    root: PathBuf,
}

impl RegistryStore {
    /// Creates a store rooted at `root`. Nothing is touched on disk until the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn apps_dir(&self) -> PathBuf {
        self.root.join(APPS_DIR)
    }

    fn pids_dir(&self) -> PathBuf {
        self.root.join(PIDS_DIR)
    }

    /// Returns the output log path for an alias.
    pub fn log_path(&self, alias: &str) -> PathBuf {
        self.root.join(LOGS_DIR).join(format!("{}.log", alias))
    }

    fn lock_path(&self, alias: &str) -> PathBuf {
        self.root.join(LOCKS_DIR).join(format!("{}.lock", alias))
    }

    /// Creates the directory layout if it does not exist yet.
    fn ensure_layout(&self) -> Result<()> {
        for dir in [APPS_DIR, PIDS_DIR, LOCKS_DIR, LOGS_DIR] {
            let path = self.root.join(dir);
            if !path.is_dir() {
                debug!(path = %path.display(), "Creating registry directory");
                fs::create_dir_all(&path)?;
            }
        }
        Ok(())
    }

    /// Creates or overwrites the record for `record.alias`.
    pub fn put(&self, record: &DaemonRecord) -> Result<()> {
        validate_alias(&record.alias)?;
        self.ensure_layout()?;

        let content = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.apps_dir(), &record.alias, &content)?;

        debug!(alias = %record.alias, status = %record.status, pid = ?record.pid, "Stored record");
        Ok(())
    }

    /// Fetches the full record for an alias.
    pub fn get(&self, alias: &str) -> Result<DaemonRecord> {
        let raw = self.read_raw(alias)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Fetches only `fields` of the record for an alias.
    pub fn project(&self, alias: &str, fields: &[&str]) -> Result<Projection> {
        let raw = self.read_raw(alias)?;
        let full: Projection = serde_json::from_slice(&raw)?;
        Ok(project(&full, fields))
    }

    /// Shallow-merges `partial` over the stored record and writes the result.
    ///
    /// The read and the write are not atomic as a pair; callers that need
    /// that hold the alias lock. The `alias` key cannot be changed.
    pub fn merge(&self, alias: &str, partial: Projection) -> Result<DaemonRecord> {
        let raw = self.read_raw(alias)?;
        let mut merged: Projection = serde_json::from_slice(&raw)?;

        for (key, value) in partial {
            if key == "alias" {
                warn!(alias = alias, "Ignoring attempt to rename record via merge");
                continue;
            }
            merged.insert(key, value);
        }

        let record: DaemonRecord = serde_json::from_value(Value::Object(merged))?;
        self.put(&record)?;
        Ok(record)
    }

    /// Lists every record, projected to `fields` when given.
    ///
    /// Order follows directory enumeration and is not sorted. Housekeeping
    /// entries are skipped, as are records that fail to parse.
    pub fn list(&self, fields: Option<&[&str]>) -> Result<Vec<Projection>> {
        let mut output = Vec::new();

        for alias in self.aliases()? {
            let raw = match self.read_raw(&alias) {
                Ok(raw) => raw,
                // removed between enumeration and read
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };

            let full: Projection = match serde_json::from_slice(&raw) {
                Ok(full) => full,
                Err(e) => {
                    warn!(alias = %alias, error = %e, "Skipping unreadable record");
                    continue;
                }
            };

            output.push(match fields {
                Some(fields) => project(&full, fields),
                None => full,
            });
        }

        Ok(output)
    }

    /// Returns the aliases with a record, in directory order.
    pub fn aliases(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(self.apps_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut aliases = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if record::is_housekeeping(&name) || !entry.file_type()?.is_file() {
                continue;
            }
            aliases.push(name);
        }

        Ok(aliases)
    }

    /// Records the PID of a freshly spawned daemon.
    pub fn write_pid_marker(&self, alias: &str, pid: u32) -> Result<()> {
        validate_alias(alias)?;
        self.ensure_layout()?;

        write_atomic(&self.pids_dir(), alias, pid.to_string().as_bytes())?;
        debug!(alias = alias, pid = pid, "Wrote PID marker");
        Ok(())
    }

    /// Whether a PID marker exists for the alias.
    pub fn has_pid_marker(&self, alias: &str) -> bool {
        validate_alias(alias).is_ok() && self.pids_dir().join(alias).is_file()
    }

    /// Reads the PID marker. Fails with `NotFound` when absent and
    /// `InvalidMarker` when the content is not a PID.
    pub fn read_pid_marker(&self, alias: &str) -> Result<u32> {
        validate_alias(alias)?;

        let content = match fs::read_to_string(self.pids_dir().join(alias)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DaemonError::not_found(alias));
            }
            Err(e) => return Err(e.into()),
        };

        content
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|pid| *pid > 0)
            .ok_or_else(|| DaemonError::InvalidMarker {
                alias: alias.to_string(),
                content,
            })
    }

    /// Removes the PID marker. Returns whether a marker was removed.
    pub fn delete_pid_marker(&self, alias: &str) -> Result<bool> {
        validate_alias(alias)?;

        match fs::remove_file(self.pids_dir().join(alias)) {
            Ok(()) => {
                debug!(alias = alias, "Deleted PID marker");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Takes the exclusive lock for an alias, waiting if necessary.
    pub fn lock(&self, alias: &str) -> Result<AliasLock> {
        validate_alias(alias)?;
        self.ensure_layout()?;
        AliasLock::acquire(&self.lock_path(alias), alias)
    }

    fn read_raw(&self, alias: &str) -> Result<Vec<u8>> {
        validate_alias(alias)?;

        match fs::read(self.apps_dir().join(alias)) {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DaemonError::not_found(alias)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes `contents` to `dir/name` via a synced temporary file and a rename.
fn write_atomic(dir: &Path, name: &str, contents: &[u8]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(dir.join(name)).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(alias: &str, pid: u32) -> DaemonRecord {
        DaemonRecord {
            alias: alias.to_string(),
            target_file: PathBuf::from("server.js"),
            working_directory: PathBuf::from("/srv/app"),
            launch_options: vec!["-A".to_string()],
            args: Vec::new(),
            executable_path: PathBuf::from("/usr/bin/node"),
            started_at: Utc::now(),
            stopped_at: None,
            started_by: Some("alice".to_string()),
            stopped_by: None,
            status: RecordStatus::Running,
            pid: Some(pid),
        }
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        let original = record("web", 4242);

        store.put(&original).unwrap();
        let loaded = store.get("web").unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_put_overwrites() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());

        store.put(&record("web", 1)).unwrap();
        store.put(&record("web", 2)).unwrap();

        assert_eq!(store.get("web").unwrap().pid, Some(2));
        assert_eq!(store.aliases().unwrap(), vec!["web".to_string()]);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());

        let err = store.get("ghost").unwrap_err();
        assert!(matches!(err, DaemonError::NotFound { ref alias } if alias == "ghost"));
    }

    #[test]
    fn test_project_returns_exactly_requested_fields() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        store.put(&record("web", 4242)).unwrap();

        let projection = store.project("web", &["status", "pid"]).unwrap();

        assert_eq!(projection.len(), 2);
        assert_eq!(projection["status"], json!("running"));
        assert_eq!(projection["pid"], json!(4242));
    }

    #[test]
    fn test_merge_updates_only_given_fields() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        let original = record("web", 4242);
        store.put(&original).unwrap();

        let mut patch = Projection::new();
        patch.insert("status".to_string(), json!("stopped"));
        patch.insert("stoppedBy".to_string(), json!("bob"));
        patch.insert("alias".to_string(), json!("renamed"));
        let merged = store.merge("web", patch).unwrap();

        assert_eq!(merged.alias, "web");
        assert_eq!(merged.status, RecordStatus::Stopped);
        assert_eq!(merged.stopped_by, Some("bob".to_string()));
        assert_eq!(merged.pid, original.pid);
        assert_eq!(merged.target_file, original.target_file);
        assert_eq!(store.get("web").unwrap(), merged);
        assert!(store.get("renamed").unwrap_err().is_not_found());
    }

    #[test]
    fn test_merge_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        store.put(&record("web", 4242)).unwrap();

        let mut patch = Projection::new();
        patch.insert("status".to_string(), json!("exploded"));

        assert!(store.merge("web", patch).is_err());
        assert_eq!(store.get("web").unwrap().status, RecordStatus::Running);
    }

    #[test]
    fn test_merge_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());

        let err = store.merge("ghost", Projection::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_skips_housekeeping_entries() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        store.put(&record("web", 1)).unwrap();
        store.put(&record("worker", 2)).unwrap();
        fs::write(dir.path().join("apps").join(".DS_Store"), b"junk").unwrap();

        let mut entries = store.list(Some(&["alias", "pid"])).unwrap();
        entries.sort_by_key(|entry| entry["pid"].as_u64());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["alias"], json!("web"));
        assert_eq!(entries[1]["alias"], json!("worker"));
        assert!(entries.iter().all(|entry| entry.len() == 2));
    }

    #[test]
    fn test_list_skips_corrupt_records() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        store.put(&record("web", 1)).unwrap();
        fs::write(dir.path().join("apps").join("broken"), b"{not json").unwrap();

        assert_eq!(store.list(None).unwrap().len(), 1);
    }

    #[test]
    fn test_reads_on_empty_store_do_not_create_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("registry");
        let store = RegistryStore::new(&root);

        assert!(store.list(None).unwrap().is_empty());
        assert!(!store.has_pid_marker("web"));
        assert!(!store.delete_pid_marker("web").unwrap());
        assert!(store.read_pid_marker("web").unwrap_err().is_not_found());
        assert!(!root.exists());
    }

    #[test]
    fn test_first_write_creates_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("registry");
        let store = RegistryStore::new(&root);

        store.write_pid_marker("web", 99).unwrap();

        for sub in ["apps", "pids", "locks", "logs"] {
            assert!(root.join(sub).is_dir(), "missing {}", sub);
        }
    }

    #[test]
    fn test_pid_marker_crud() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());

        assert!(!store.has_pid_marker("web"));
        store.write_pid_marker("web", 4242).unwrap();
        assert!(store.has_pid_marker("web"));
        assert_eq!(store.read_pid_marker("web").unwrap(), 4242);
        assert_eq!(
            fs::read_to_string(dir.path().join("pids").join("web")).unwrap(),
            "4242"
        );

        assert!(store.delete_pid_marker("web").unwrap());
        assert!(!store.has_pid_marker("web"));
        assert!(!store.delete_pid_marker("web").unwrap());
    }

    #[test]
    fn test_invalid_pid_marker() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        store.write_pid_marker("web", 1).unwrap();
        fs::write(dir.path().join("pids").join("web"), "not-a-pid").unwrap();

        let err = store.read_pid_marker("web").unwrap_err();
        assert!(matches!(err, DaemonError::InvalidMarker { .. }));
    }

    #[test]
    fn test_marker_and_record_namespaces_are_independent() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());

        store.write_pid_marker("web", 10).unwrap();
        assert!(store.get("web").unwrap_err().is_not_found());

        store.put(&record("api", 20)).unwrap();
        assert!(!store.has_pid_marker("api"));
    }

    #[test]
    fn test_alias_isolation() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        let api = record("api", 20);
        store.put(&api).unwrap();
        store.write_pid_marker("api", 20).unwrap();

        store.put(&record("web", 10)).unwrap();
        store.write_pid_marker("web", 10).unwrap();
        let mut patch = Projection::new();
        patch.insert("status".to_string(), json!("stopped"));
        store.merge("web", patch).unwrap();
        store.delete_pid_marker("web").unwrap();

        assert_eq!(store.get("api").unwrap(), api);
        assert_eq!(store.read_pid_marker("api").unwrap(), 20);
    }

    #[test]
    fn test_rejects_path_traversal_aliases() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());

        assert!(store.write_pid_marker("../escape", 1).is_err());
        assert!(store.get("../escape").is_err());
        assert!(store.put(&record("a/b", 1)).is_err());
    }

    #[test]
    fn test_longest_alias_can_be_locked() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path());
        let alias = "a".repeat(250);

        let _lock = store.lock(&alias).unwrap();
        store.write_pid_marker(&alias, 7).unwrap();
        assert!(dir.path().join("locks").join(format!("{}.lock", alias)).is_file());

        let err = store.lock(&"a".repeat(251)).unwrap_err();
        assert!(matches!(err, DaemonError::InvalidAlias { .. }));
    }

    #[test]
    fn test_log_path() {
        let store = RegistryStore::new("/tmp/registry");
        assert_eq!(
            store.log_path("web"),
            PathBuf::from("/tmp/registry/logs/web.log")
        );
    }
}
