//! Core Bloom filter implementation
//!
//! INVARIANTS:
//! - FPR = (1 - e^(-kn/m))^k <= target fpp when n <= expected insertions
//! - No false negatives: once inserted, contains() returns true

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use super::hash_functions::compute_hash_positions;
use super::parameters::{calculate_fpr, calculate_optimal_parameters};

/// Largest bit array a filter may allocate (2 GiB words of 64 bits)
pub const MAX_SIZE_BITS: u64 = (i32::MAX as u64) * 64;

/// Bloom filter for probabilistic membership testing
///
/// False positives are possible, false negatives are not.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BloomFilter {
    /// Bit array storing the filter state
    #[serde(with = "bitvec_serde")]
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions (k)
    k: usize,
    /// Size in bits (m)
    m: usize,
    /// Number of state-changing insertions
    n: usize,
}

/// Serde support for BitVec
mod bitvec_serde {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bits: &BitVec<u8, Lsb0>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (bits.as_raw_slice(), bits.len()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BitVec<u8, Lsb0>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(deserializer)?;
        if len > bytes.len() * 8 {
            return Err(serde::de::Error::custom(format!(
                "bit length {} exceeds {} stored bytes",
                len,
                bytes.len()
            )));
        }
        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}

impl BloomFilter {
    /// Create a new Bloom filter with `m` bits and `k` hash functions
    pub fn new(m: usize, k: usize) -> Self {
        let m = m.max(1);
        Self {
            bits: bitvec![u8, Lsb0; 0; m],
            k: k.max(1),
            m,
            n: 0,
        }
    }

    /// Create a new Bloom filter sized for `expected_elements` at `target_fpr`
    pub fn new_with_fpr(expected_elements: usize, target_fpr: f64) -> Self {
        let params = calculate_optimal_parameters(expected_elements, target_fpr);
        Self::new(params.size_bits, params.hash_count)
    }

    /// Insert an element into the filter
    ///
    /// Returns true if at least one bit flipped, i.e. the element was not
    /// already reported as present.
    pub fn insert(&mut self, element: &[u8]) -> bool {
        let mut changed = false;
        for pos in compute_hash_positions(element, self.k, self.m) {
            if !self.bits[pos] {
                self.bits.set(pos, true);
                changed = true;
            }
        }
        if changed {
            self.n += 1;
        }
        changed
    }

    /// Test if an element might be in the filter
    pub fn contains(&self, element: &[u8]) -> bool {
        compute_hash_positions(element, self.k, self.m)
            .iter()
            .all(|&pos| self.bits[pos])
    }

    /// Current false positive rate given the insertions so far
    pub fn false_positive_rate(&self) -> f64 {
        calculate_fpr(self.m, self.n, self.k)
    }

    /// Get the number of bits set in the filter
    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    /// Get the filter size in bits
    pub fn size_bits(&self) -> usize {
        self.m
    }

    /// Get the number of hash functions
    pub fn hash_count(&self) -> usize {
        self.k
    }

    /// Get the number of state-changing insertions
    pub fn elements_inserted(&self) -> usize {
        self.n
    }

    /// Check internal consistency after deserialization
    pub(crate) fn is_consistent(&self) -> bool {
        self.m > 0 && self.k > 0 && self.bits.len() == self.m
    }
}
