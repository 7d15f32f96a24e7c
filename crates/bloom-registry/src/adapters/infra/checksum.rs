//! CRC-32C (Castagnoli) checksums for snapshot frames

/// Compute the checksum of `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Verify that `data` hashes to `expected`.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
