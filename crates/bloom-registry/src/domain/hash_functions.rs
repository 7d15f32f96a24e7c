//! Hash functions for the Bloom filter
//!
//! Uses MurmurHash3 (x64, 128-bit) and derives k positions by double hashing.

use std::io::Cursor;

/// Hash an element with MurmurHash3 and return the low and high 64-bit halves
pub fn murmur_hash128(element: &[u8], seed: u32) -> (u64, u64) {
    let mut cursor = Cursor::new(element);
    // Reading from an in-memory cursor cannot fail
    let hash = murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0);
    (hash as u64, (hash >> 64) as u64)
}

/// Compute k bit positions in `[0, m)` for an element
///
/// Double hashing: h(i) = h1 + i * h2, with both halves taken from a single
/// 128-bit hash.
pub fn compute_hash_positions(element: &[u8], k: usize, m: usize) -> Vec<usize> {
    let (h1, h2) = murmur_hash128(element, 0);

    (0..k)
        .map(|i| {
            let hash = h1.wrapping_add((i as u64).wrapping_mul(h2));
            (hash % m as u64) as usize
        })
        .collect()
}
