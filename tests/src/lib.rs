//! # Bloom Registry Test Suite
//!
//! End-to-end flows across the registry, purgatory, snapshot log and
//! scheduler, driven through the public API only.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── lifecycle.rs     # create / set / expire / purge
//!     └── persistence.rs   # freeze, recover, corruption, locking, runtime
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bloom-registry-tests
//! cargo test -p bloom-registry-tests integration::persistence::
//! ```

pub mod integration;
