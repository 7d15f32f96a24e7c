//! # Record Frame Codec
//!
//! One named filter is stored as one frame:
//!
//! ```text
//! +------------+-------+----------+------------+-----------+-------------+
//! | body_len:4 | magic | crc32c:4 | name_len:4 | name      | filter body |
//! +------------+-------+----------+------------+-----------+-------------+
//! |<------- header (9 bytes) ---->|<------------- body_len ------------->|
//! ```
//!
//! Integers are big-endian. The checksum covers exactly the body.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::adapters::infra::{compute_checksum, verify_checksum};
use crate::error::{CorruptFrame, PersistenceError};
use crate::ports::{Filter, FilterFactory};

/// Format version byte carried by every frame
pub const MAGIC: u8 = 0x5A;

/// body_len (4) + magic (1) + checksum (4)
pub const HEADER_SIZE: usize = 9;

const NAME_LEN_SIZE: usize = 4;

/// A named filter as stored in the snapshot log
#[derive(Clone)]
pub struct FilterRecord {
    pub name: String,
    pub filter: Arc<dyn Filter>,
}

impl FilterRecord {
    pub fn new(name: impl Into<String>, filter: Arc<dyn Filter>) -> Self {
        Self {
            name: name.into(),
            filter,
        }
    }
}

impl fmt::Debug for FilterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRecord")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Parsed fixed-size frame header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub body_len: u32,
    pub magic: u8,
    pub checksum: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            body_len: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            magic: bytes[4],
            checksum: u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
        }
    }
}

/// Build a complete frame for `name` and `filter`.
pub fn encode_frame(name: &str, filter: &dyn Filter) -> Result<Vec<u8>, PersistenceError> {
    let body = filter
        .serialize()
        .map_err(|source| PersistenceError::Filter {
            name: name.to_string(),
            source,
        })?;

    let name_bytes = name.as_bytes();
    let body_len = NAME_LEN_SIZE + name_bytes.len() + body.len();
    let body_len_u32 = u32::try_from(body_len).map_err(|_| PersistenceError::Io {
        context: "encode",
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("frame body of {} bytes exceeds u32", body_len),
        ),
    })?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + body_len);
    frame.extend_from_slice(&body_len_u32.to_be_bytes());
    frame.push(MAGIC);
    frame.extend_from_slice(&[0u8; 4]);
    frame.extend_from_slice(&(name_bytes.len() as u32).to_be_bytes());
    frame.extend_from_slice(name_bytes);
    frame.extend_from_slice(&body);

    let checksum = compute_checksum(&frame[HEADER_SIZE..]);
    frame[5..HEADER_SIZE].copy_from_slice(&checksum.to_be_bytes());
    Ok(frame)
}

/// Encode a frame and write it with a single `write_all`.
///
/// Returns the number of bytes written.
pub fn encode_record<W: Write>(
    out: &mut W,
    name: &str,
    filter: &dyn Filter,
) -> Result<usize, PersistenceError> {
    let frame = encode_frame(name, filter)?;
    out.write_all(&frame).map_err(PersistenceError::io("append"))?;
    Ok(frame.len())
}

/// Validate a frame whose header and full body have been read.
///
/// `position` is the offset of the frame's first byte in the log.
pub fn decode_body(
    header: FrameHeader,
    body: &[u8],
    position: usize,
    factory: &dyn FilterFactory,
) -> Result<FilterRecord, CorruptFrame> {
    if header.magic != MAGIC {
        return Err(CorruptFrame::BadMagic {
            found: header.magic,
            expected: MAGIC,
            position: position + 4,
        });
    }

    if !verify_checksum(body, header.checksum) {
        return Err(CorruptFrame::ChecksumMismatch {
            expected: header.checksum,
            actual: compute_checksum(body),
            position,
        });
    }

    let malformed = |reason: String| CorruptFrame::MalformedBody { position, reason };

    if body.len() < NAME_LEN_SIZE {
        return Err(malformed(format!("body of {} bytes has no name length", body.len())));
    }
    let name_len = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let name_end = NAME_LEN_SIZE
        .checked_add(name_len)
        .filter(|&end| end <= body.len())
        .ok_or_else(|| {
            malformed(format!(
                "name length {} overruns body of {} bytes",
                name_len,
                body.len()
            ))
        })?;

    let name = std::str::from_utf8(&body[NAME_LEN_SIZE..name_end])
        .map_err(|e| malformed(format!("name is not UTF-8: {}", e)))?
        .to_string();

    let filter = factory
        .deserialize(&body[name_end..])
        .map_err(|e| malformed(format!("filter {}: {}", name, e)))?;

    Ok(FilterRecord { name, filter })
}
