//! # File Lock Implementation
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from directory locking
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created
    #[error("Failed to create lock file {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory is already locked by another process
    #[error("Snapshot directory already in use ({})", path.display())]
    AlreadyLocked { path: PathBuf },
}

/// Exclusive advisory lock on a snapshot directory.
///
/// The sentinel file stays empty; only its existence and the OS lock matter.
/// Released on drop (RAII) or by `release`.
#[derive(Debug)]
pub struct DirectoryLock {
    /// The lock file handle (kept open to maintain lock)
    file: File,
    /// Path to the lock file
    path: PathBuf,
}

impl DirectoryLock {
    /// Lock file name
    pub const LOCK_FILE: &'static str = "LOCK";

    /// Acquire an exclusive lock on `dir` without waiting.
    ///
    /// # Errors
    ///
    /// Returns `LockError::AlreadyLocked` if another holder owns the lock.
    pub fn acquire(dir: &Path) -> Result<Self, LockError> {
        let lock_path = dir.join(Self::LOCK_FILE);

        // Never truncate: the current holder's file must stay untouched
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| LockError::CreateFailed {
                path: lock_path.clone(),
                source,
            })?;

        // UFCS: std's inherent File::try_lock_exclusive has a different error type
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Self {
                file,
                path: lock_path,
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::AlreadyLocked { path: lock_path })
            }
            Err(source) => Err(LockError::CreateFailed {
                path: lock_path,
                source,
            }),
        }
    }

    /// Get the path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlock now and report the outcome.
    ///
    /// Dropping the lock also unlocks, but discards any error.
    pub fn release(self) -> io::Result<()> {
        FileExt::unlock(&self.file)
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        // Already unlocked after release(); unlocking twice is a no-op
        let _ = FileExt::unlock(&self.file);
    }
}
