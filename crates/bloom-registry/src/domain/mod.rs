//! Domain Layer - Pure business logic
//!
//! This layer contains:
//! - Core Bloom filter implementation
//! - Hash functions
//! - Parameter calculations
//! - Filter configuration
//! - Expirable filter and its factory
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod bloom_filter;
pub mod config;
pub mod expirable_filter;
pub mod hash_functions;
pub mod parameters;

pub use bloom_filter::BloomFilter;
pub use config::{FilterConfig, FilterConfigBuilder};
pub use expirable_filter::{ExpirableBloomFilter, ExpirableBloomFilterFactory};
pub use parameters::{calculate_optimal_parameters, BloomFilterParams};
