//! Filter configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use bloom_registry::domain::FilterConfigBuilder;
//! use std::time::Duration;
//!
//! let config = FilterConfigBuilder::new("sessions")
//!     .expected_insertions(10_000)
//!     .fpp(0.001)
//!     .valid_period_after_write(Duration::from_secs(3600))
//!     .build()
//!     .expect("Valid config");
//! ```

use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::error::FilterError;

use super::bloom_filter::MAX_SIZE_BITS;
use super::parameters::calculate_optimal_parameters;

/// Default number of expected insertions
pub const DEFAULT_EXPECTED_INSERTIONS: usize = 1_000_000;
/// Default false positive probability
pub const DEFAULT_FPP: f64 = 0.0001;
/// Default lifetime of a filter after creation (one day)
pub const DEFAULT_VALID_PERIOD_AFTER_WRITE: Duration = Duration::from_secs(24 * 60 * 60);

/// Immutable configuration a filter is created from.
///
/// Equality and hashing cover every field, so two create requests carrying
/// the same parameters compare equal.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    name: String,
    expected_insertions: usize,
    fpp: f64,
    valid_period_after_write: Duration,
    valid_period_after_access: Option<Duration>,
}

impl FilterConfig {
    /// Configuration with every parameter at its default
    pub fn with_defaults(name: impl Into<String>) -> Result<Self, FilterError> {
        FilterConfigBuilder::new(name).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected_insertions(&self) -> usize {
        self.expected_insertions
    }

    pub fn fpp(&self) -> f64 {
        self.fpp
    }

    pub fn valid_period_after_write(&self) -> Duration {
        self.valid_period_after_write
    }

    pub fn valid_period_after_access(&self) -> Option<Duration> {
        self.valid_period_after_access
    }

    fn validate(&self) -> Result<(), FilterError> {
        if self.name.is_empty() {
            return Err(FilterError::bad_parameter("name", "must not be empty"));
        }
        if self.expected_insertions == 0 {
            return Err(FilterError::bad_parameter(
                "expected_insertions",
                "must be greater than 0",
            ));
        }
        // Also rejects NaN
        if !(self.fpp > 0.0 && self.fpp < 1.0) {
            return Err(FilterError::bad_parameter(
                "fpp",
                format!("{} is not in (0, 1)", self.fpp),
            ));
        }
        let size_bits = calculate_optimal_parameters(self.expected_insertions, self.fpp).size_bits;
        if size_bits as u64 > MAX_SIZE_BITS {
            return Err(FilterError::bad_parameter(
                "expected_insertions",
                format!(
                    "{} insertions at fpp {} need {} bits, over the {} bit limit",
                    self.expected_insertions, self.fpp, size_bits, MAX_SIZE_BITS
                ),
            ));
        }
        if self.valid_period_after_write.is_zero() {
            return Err(FilterError::bad_parameter(
                "valid_period_after_write",
                "must be greater than 0",
            ));
        }
        if self.valid_period_after_access.is_some_and(|d| d.is_zero()) {
            return Err(FilterError::bad_parameter(
                "valid_period_after_access",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl PartialEq for FilterConfig {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.expected_insertions == other.expected_insertions
            && self.fpp.to_bits() == other.fpp.to_bits()
            && self.valid_period_after_write == other.valid_period_after_write
            && self.valid_period_after_access == other.valid_period_after_access
    }
}

impl Eq for FilterConfig {}

impl Hash for FilterConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.expected_insertions.hash(state);
        self.fpp.to_bits().hash(state);
        self.valid_period_after_write.hash(state);
        self.valid_period_after_access.hash(state);
    }
}

/// Builder for FilterConfig with validation
pub struct FilterConfigBuilder {
    name: String,
    expected_insertions: Option<usize>,
    fpp: Option<f64>,
    valid_period_after_write: Option<Duration>,
    valid_period_after_access: Option<Duration>,
}

impl FilterConfigBuilder {
    /// Create a builder for the filter registered under `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_insertions: None,
            fpp: None,
            valid_period_after_write: None,
            valid_period_after_access: None,
        }
    }

    pub fn expected_insertions(mut self, n: usize) -> Self {
        self.expected_insertions = Some(n);
        self
    }

    /// Set the false positive probability (exclusive range 0 to 1)
    pub fn fpp(mut self, fpp: f64) -> Self {
        self.fpp = Some(fpp);
        self
    }

    pub fn valid_period_after_write(mut self, period: Duration) -> Self {
        self.valid_period_after_write = Some(period);
        self
    }

    /// Enable sliding expiration: every access pushes expiry out by `period`
    pub fn valid_period_after_access(mut self, period: Duration) -> Self {
        self.valid_period_after_access = Some(period);
        self
    }

    /// Build the FilterConfig, validating all parameters
    pub fn build(self) -> Result<FilterConfig, FilterError> {
        let config = FilterConfig {
            name: self.name,
            expected_insertions: self
                .expected_insertions
                .unwrap_or(DEFAULT_EXPECTED_INSERTIONS),
            fpp: self.fpp.unwrap_or(DEFAULT_FPP),
            valid_period_after_write: self
                .valid_period_after_write
                .unwrap_or(DEFAULT_VALID_PERIOD_AFTER_WRITE),
            valid_period_after_access: self.valid_period_after_access,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builder_uses_defaults() {
        let config = FilterConfigBuilder::new("a").build().unwrap();

        assert_eq!(config.name(), "a");
        assert_eq!(config.expected_insertions(), DEFAULT_EXPECTED_INSERTIONS);
        assert_eq!(config.fpp(), DEFAULT_FPP);
        assert_eq!(
            config.valid_period_after_write(),
            DEFAULT_VALID_PERIOD_AFTER_WRITE
        );
        assert_eq!(config.valid_period_after_access(), None);
    }

    #[test]
    fn test_builder_rejects_empty_name() {
        let result = FilterConfigBuilder::new("").build();
        assert!(matches!(
            result,
            Err(FilterError::BadParameter { name: "name", .. })
        ));
    }

    #[test]
    fn test_builder_rejects_zero_insertions() {
        let result = FilterConfigBuilder::new("a").expected_insertions(0).build();
        assert!(matches!(
            result,
            Err(FilterError::BadParameter {
                name: "expected_insertions",
                ..
            })
        ));
    }

    #[test]
    fn test_builder_rejects_fpp_out_of_range() {
        for fpp in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let result = FilterConfigBuilder::new("a").fpp(fpp).build();
            assert!(
                matches!(result, Err(FilterError::BadParameter { name: "fpp", .. })),
                "fpp {} should be rejected",
                fpp
            );
        }
    }

    #[test]
    fn test_builder_rejects_oversized_filter() {
        for (insertions, fpp) in [(usize::MAX / 4, 0.5), (usize::MAX, 0.0001), (1 << 40, 1e-9)] {
            let result = FilterConfigBuilder::new("huge")
                .expected_insertions(insertions)
                .fpp(fpp)
                .build();
            assert!(
                matches!(
                    result,
                    Err(FilterError::BadParameter {
                        name: "expected_insertions",
                        ..
                    })
                ),
                "{} insertions at fpp {} should be rejected",
                insertions,
                fpp
            );
        }
    }

    #[test]
    fn test_builder_accepts_filter_at_size_limit() {
        // About 1.44 bits per insertion at fpp 0.5
        let config = FilterConfigBuilder::new("large")
            .expected_insertions(i32::MAX as usize)
            .fpp(0.5)
            .build()
            .unwrap();
        let bits = calculate_optimal_parameters(config.expected_insertions(), config.fpp()).size_bits;
        assert!(bits as u64 <= MAX_SIZE_BITS);
    }

    #[test]
    fn test_builder_rejects_zero_periods() {
        let result = FilterConfigBuilder::new("a")
            .valid_period_after_write(Duration::ZERO)
            .build();
        assert!(result.is_err());

        let result = FilterConfigBuilder::new("a")
            .valid_period_after_access(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_equality_and_hash_cover_all_fields() {
        let base = FilterConfigBuilder::new("a").fpp(0.01).build().unwrap();
        let same = FilterConfigBuilder::new("a").fpp(0.01).build().unwrap();
        let other = FilterConfigBuilder::new("a")
            .fpp(0.01)
            .valid_period_after_access(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(base, same);
        assert_ne!(base, other);

        let set: HashSet<FilterConfig> = [base, same, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
