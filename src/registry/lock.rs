//! Per-alias advisory locking.
//!
//! Mutating operations (start, stop, restart) hold an exclusive `flock` on
//! `locks/<alias>.lock` so that two invocations racing on the same alias are
//! serialized. Locks on different aliases never contend.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{DaemonError, Result};

/// An exclusive lock on one alias, released on drop.
#[derive(Debug)]
pub struct AliasLock {
    alias: String,
    path: PathBuf,
    file: File,
}

impl AliasLock {
    /// Acquires the lock at `path`, blocking while another invocation holds it.
    pub fn acquire(path: &Path, alias: &str) -> Result<Self> {
        if let Some(lock) = Self::try_acquire(path, alias)? {
            return Ok(lock);
        }

        info!(alias = alias, "Waiting for another invocation to release the daemon");
        let file = open(path, alias)?;
        FileExt::lock_exclusive(&file).map_err(|source| lock_error(alias, source))?;

        Ok(Self::held(path, alias, file))
    }

    /// Attempts to acquire the lock without blocking.
    /// Returns `Ok(None)` when another holder has it.
    pub fn try_acquire(path: &Path, alias: &str) -> Result<Option<Self>> {
        let file = open(path, alias)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self::held(path, alias, file))),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(lock_error(alias, e)),
        }
    }

    fn held(path: &Path, alias: &str, file: File) -> Self {
        debug!(alias = alias, path = %path.display(), "Acquired alias lock");
        Self {
            alias: alias.to_string(),
            path: path.to_path_buf(),
            file,
        }
    }
}

fn lock_error(alias: &str, source: std::io::Error) -> DaemonError {
    DaemonError::Lock {
        alias: alias.to_string(),
        source,
    }
}

// Opening must not truncate: the holder may have written to it.
fn open(path: &Path, alias: &str) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| lock_error(alias, source))
}

impl Drop for AliasLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(alias = %self.alias, path = %self.path.display(), error = %e, "Failed to release alias lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_excludes_second_holder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("web.lock");

        let held = AliasLock::acquire(&path, "web").unwrap();
        assert!(AliasLock::try_acquire(&path, "web").unwrap().is_none());

        drop(held);
        assert!(AliasLock::try_acquire(&path, "web").unwrap().is_some());
    }

    #[test]
    fn test_locks_on_different_aliases_do_not_contend() {
        let dir = tempdir().unwrap();

        let _web = AliasLock::acquire(&dir.path().join("web.lock"), "web").unwrap();
        let api = AliasLock::try_acquire(&dir.path().join("api.lock"), "api").unwrap();
        assert!(api.is_some());
    }

    #[test]
    fn test_lock_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("web.lock");

        let err = AliasLock::acquire(&path, "web").unwrap_err();
        assert!(matches!(err, DaemonError::Lock { .. }));
    }
}
