//! Persistence Manager
//!
//! Owns the snapshot directory for the life of the process:
//!
//! - `open` creates the directory and takes the exclusive `LOCK`
//! - `freeze_all_filters` writes `filters.snapshot.tmp`, syncs it, then
//!   renames it over `filters.snapshot` (copy fallback if rename fails)
//! - `recover_from_snapshot` reads the snapshot back into the registry
//! - `close` releases the lock; later operations fail with `Closed`
//!
//! Freezes and recoveries are serialized on the state mutex, so a snapshot
//! file is never written by two threads at once.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::adapters::lock::DirectoryLock;
use crate::adapters::log::{LogReader, LogWriter, NextRecord};
use crate::error::PersistenceError;
use crate::ports::SnapshotFreezer;

use super::registry::FilterRegistry;

/// Snapshot file name inside the data directory
pub const SNAPSHOT_FILE: &str = "filters.snapshot";
/// Scratch file a freeze writes before replacing the snapshot
pub const SNAPSHOT_TMP_FILE: &str = "filters.snapshot.tmp";

#[derive(Debug)]
enum State {
    Open(DirectoryLock),
    Closed,
}

/// Durable snapshot store for one registry
pub struct PersistenceManager {
    dir: PathBuf,
    registry: Arc<FilterRegistry>,
    state: Mutex<State>,
}

impl PersistenceManager {
    /// Open `dir`, creating it if missing, and lock it against other holders.
    ///
    /// # Errors
    ///
    /// - `NotADirectory` if `dir` exists as a regular file
    /// - `Lock(AlreadyLocked)` if another manager holds the directory
    pub fn open(
        dir: impl AsRef<Path>,
        registry: Arc<FilterRegistry>,
    ) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref();
        if dir.exists() && !dir.is_dir() {
            return Err(PersistenceError::NotADirectory(dir.to_path_buf()));
        }
        fs::create_dir_all(dir).map_err(PersistenceError::io("create data directory"))?;

        let lock = DirectoryLock::acquire(dir)?;
        info!(dir = %dir.display(), "[persistence] Data directory locked");

        Ok(Self {
            dir: dir.to_path_buf(),
            registry,
            state: Mutex::new(State::Open(lock)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), State::Open(_))
    }

    /// Write every registry entry to a new snapshot.
    ///
    /// Returns the number of filters frozen. The previous snapshot stays
    /// intact until the new one is fully synced.
    pub fn freeze_all_filters(&self) -> Result<usize, PersistenceError> {
        self.freeze_with(|from, to| fs::rename(from, to))
    }

    fn freeze_with<F>(&self, rename: F) -> Result<usize, PersistenceError>
    where
        F: FnOnce(&Path, &Path) -> io::Result<()>,
    {
        let state = self.state.lock();
        ensure_open(&state)?;

        let tmp_path = self.dir.join(SNAPSHOT_TMP_FILE);
        let frozen = LogWriter::create(&tmp_path)?.freeze_all(self.registry.entries())?;
        replace_snapshot(&tmp_path, &self.snapshot_path(), rename)?;
        sync_dir(&self.dir);

        debug!(frozen, "[persistence] Snapshot replaced");
        Ok(frozen)
    }

    /// Load the snapshot into the registry.
    ///
    /// Only filters still valid are kept. A corrupt frame ends the read: with
    /// `allow_corrupted` the filters before it are kept, otherwise nothing is
    /// loaded and the corruption is returned.
    pub fn recover_from_snapshot(&self, allow_corrupted: bool) -> Result<usize, PersistenceError> {
        let state = self.state.lock();
        ensure_open(&state)?;

        let path = self.snapshot_path();
        if !path.exists() {
            info!(path = %path.display(), "[persistence] No snapshot to recover");
            return Ok(0);
        }

        let mut reader = LogReader::open(&path, self.registry.factory().clone())?;
        let mut batch = Vec::new();
        let mut skipped = 0usize;

        loop {
            match reader.next_record()? {
                NextRecord::Record(record) => {
                    if record.filter.is_valid() {
                        batch.push(record);
                    } else {
                        skipped += 1;
                    }
                }
                NextRecord::EndOfStream => break,
                NextRecord::Corrupt(cause) => {
                    if !allow_corrupted {
                        error!(
                            error = %cause,
                            "[persistence] Snapshot corrupted, refusing to recover"
                        );
                        return Err(PersistenceError::Corrupted(cause));
                    }
                    warn!(
                        error = %cause,
                        recovered = batch.len(),
                        "[persistence] Snapshot corrupted, keeping filters read so far"
                    );
                    break;
                }
            }
        }

        let recovered = self.registry.add_filters(batch);
        info!(recovered, skipped, "[persistence] Snapshot recovered");
        Ok(recovered)
    }

    /// Release the directory lock. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if let State::Open(lock) = std::mem::replace(&mut *state, State::Closed) {
            match lock.release() {
                Ok(()) => info!(dir = %self.dir.display(), "[persistence] Data directory released"),
                Err(e) => warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "[persistence] Unlock failed, lock file dropped"
                ),
            }
        }
    }
}

impl SnapshotFreezer for PersistenceManager {
    fn freeze(&self) -> Result<usize, PersistenceError> {
        self.freeze_all_filters()
    }
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("dir", &self.dir)
            .field("open", &self.is_open())
            .finish()
    }
}

fn ensure_open(state: &State) -> Result<(), PersistenceError> {
    match state {
        State::Open(_) => Ok(()),
        State::Closed => Err(PersistenceError::Closed),
    }
}

/// Move `tmp` over `target`, falling back to copy-then-remove.
fn replace_snapshot<F>(tmp: &Path, target: &Path, rename: F) -> Result<(), PersistenceError>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let rename_err = match rename(tmp, target) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    warn!(error = %rename_err, "[persistence] Rename failed, falling back to copy");

    copy_replace(tmp, target).map_err(|copy| PersistenceError::ReplaceFailed {
        rename: rename_err,
        copy,
    })
}

fn copy_replace(tmp: &Path, target: &Path) -> io::Result<()> {
    fs::copy(tmp, target)?;
    OpenOptions::new().write(true).open(target)?.sync_all()?;
    if let Err(e) = fs::remove_file(tmp) {
        // The snapshot itself is in place; the next freeze truncates tmp
        warn!(error = %e, "[persistence] Could not remove temporary snapshot");
    }
    Ok(())
}

/// Persist the rename itself. Best effort: not every platform can fsync a
/// directory handle.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
            debug!(error = %e, "[persistence] Directory sync skipped");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
    }
}
