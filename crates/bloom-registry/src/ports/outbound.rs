//! Outbound Ports (Driven Ports)
//!
//! Dependencies the registry needs from its host environment.

/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds since epoch.
    fn now_millis(&self) -> Timestamp;
}

/// Writes a full snapshot of the registry (driven by the persistence jobs).
pub trait SnapshotFreezer: Send + Sync {
    /// Freeze every filter. Returns the number of filters written.
    fn freeze(&self) -> Result<usize, crate::error::PersistenceError>;
}
