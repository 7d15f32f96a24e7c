//! Infrastructure Adapters
//!
//! Implementations of infrastructure concerns (time, checksum).

mod checksum;
mod time;

pub use checksum::{compute_checksum, verify_checksum};
pub use time::{ManualClock, SystemTimeSource};
