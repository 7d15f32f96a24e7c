//! Error types for the filter registry
//!
//! One enum per layer:
//! - `FilterError`: configuration and filter body failures
//! - `RegistryError`: request-facing registry failures
//! - `CorruptFrame`: a snapshot frame that is complete but unreadable
//! - `PersistenceError`: snapshot directory and file failures
//! - `ConfigError`: unusable registry configuration
//! - `RuntimeError`: bootstrap and shutdown of the whole registry

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::adapters::lock::LockError;

/// Boxed error returned by registry listeners.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by filters and their configuration
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid parameter {name}: {reason}")]
    BadParameter { name: &'static str, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FilterError {
    pub(crate) fn bad_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        FilterError::BadParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced to callers of the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Filter not found: {0}")]
    FilterNotFound(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Listener failed on {event} of filter {name}: {source}")]
    Listener {
        event: &'static str,
        name: String,
        #[source]
        source: ListenerError,
    },
}

impl RegistryError {
    /// Status code the request layer maps this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::FilterNotFound(_) => 404,
            RegistryError::Filter(FilterError::BadParameter { .. }) => 400,
            _ => 503,
        }
    }
}

/// A frame whose bytes are all present but which fails validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptFrame {
    #[error("Bad magic byte 0x{found:02x} at position {position} (expected 0x{expected:02x})")]
    BadMagic {
        found: u8,
        expected: u8,
        position: usize,
    },

    #[error("Checksum mismatch at position {position}: expected {expected:#010x}, actual {actual:#010x}")]
    ChecksumMismatch {
        expected: u32,
        actual: u32,
        position: usize,
    },

    #[error("Malformed frame body at position {position}: {reason}")]
    MalformedBody { position: usize, reason: String },
}

/// Errors from the snapshot directory, the log files and recovery
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Persistent storage error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot corrupted: {0}")]
    Corrupted(#[from] CorruptFrame),

    #[error("Snapshot path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Filter serialization failed for {name}: {source}")]
    Filter {
        name: String,
        #[source]
        source: FilterError,
    },

    #[error("Snapshot replace failed: rename ({rename}), copy ({copy})")]
    ReplaceFailed { rename: io::Error, copy: io::Error },

    #[error("Persistence manager is closed")]
    Closed,
}

impl PersistenceError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| PersistenceError::Io { context, source }
    }

    /// Whether retrying is pointless because the process is out of resources.
    pub fn is_resource_exhausted(&self) -> bool {
        match self {
            PersistenceError::Io { source, .. } => source.kind() == io::ErrorKind::OutOfMemory,
            PersistenceError::ReplaceFailed { copy, .. } => {
                copy.kind() == io::ErrorKind::OutOfMemory
            }
            _ => false,
        }
    }
}

/// Rejected registry configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Data directory must not be empty")]
    EmptyDataDir,

    #[error("Purge interval must be greater than zero")]
    ZeroPurgeInterval,

    #[error("Trigger {index}: checking period must be greater than zero")]
    ZeroCheckingPeriod { index: usize },
}

/// Errors starting or stopping a registry runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Scheduler must be started inside a tokio runtime")]
    NoAsyncRuntime,

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}
