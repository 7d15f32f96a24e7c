//! Adapters Layer (Driven Adapters)
//!
//! Implementations that touch the outside world.
//!
//! ## Adapters
//!
//! - `infra` - System clock, manual clock, CRC-32C checksums
//! - `lock` - Exclusive advisory lock on the snapshot directory
//! - `log` - Snapshot log frame codec, reader and writer

pub mod infra;
pub mod lock;
pub mod log;
