//! # Snapshot Directory Locking
//!
//! Prevents multiple processes from owning the same snapshot directory.
//!
//! ## Modules
//!
//! - `flock`: advisory lock on a sentinel file using fs2

mod flock;

pub use flock::{DirectoryLock, LockError};
