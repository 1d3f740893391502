//! File-based locking to prevent concurrent execution.
//!
//! Uses flock-style advisory locking on a file inside the storage directory so
//! that two filtersync processes never rewrite the same filters and config at once.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".filtersync.lock";

/// A guard that holds an exclusive lock on the storage directory.
/// The lock is automatically released when the guard is dropped.
pub struct LockGuard {
    _file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Attempt to acquire an exclusive lock on `dir`.
    /// Returns an error if another instance holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        let lock_path = dir.join(LOCK_FILE);

        // Open without truncating so create and lock are not racing each other
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        fs::set_permissions(&lock_path, fs::Permissions::from_mode(0o600))
            .context("Failed to set lock file permissions")?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another instance of filtersync is using {:?}.\n\
                 Wait for it to finish or stop the running daemon.",
                dir
            )
        })?;

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
