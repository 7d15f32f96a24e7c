//! # Snapshot Log Reader
//!
//! Sequential, single-pass reader over a log of record frames. A truncated
//! tail (fewer bytes than one full frame) ends the stream cleanly, which lets
//! recovery survive a writer that crashed mid-append.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::{CorruptFrame, PersistenceError};
use crate::ports::FilterFactory;

use super::record::{decode_body, FilterRecord, FrameHeader, HEADER_SIZE};

/// Outcome of one `LogReader::next_record` call
#[derive(Debug)]
pub enum NextRecord {
    Record(FilterRecord),
    /// No complete frame remains
    EndOfStream,
    /// A complete frame failed validation
    Corrupt(CorruptFrame),
}

/// Reads frames one at a time from a byte source
pub struct LogReader<R: Read = BufReader<File>> {
    source: R,
    factory: Arc<dyn FilterFactory>,
    position: usize,
    finished: bool,
}

impl LogReader<BufReader<File>> {
    /// Open a snapshot file for reading
    pub fn open(path: &Path, factory: Arc<dyn FilterFactory>) -> Result<Self, PersistenceError> {
        let file = File::open(path).map_err(PersistenceError::io("open snapshot"))?;
        Ok(Self::new(BufReader::new(file), factory))
    }
}

impl<R: Read> LogReader<R> {
    pub fn new(source: R, factory: Arc<dyn FilterFactory>) -> Self {
        Self {
            source,
            factory,
            position: 0,
            finished: false,
        }
    }

    /// Offset of the next unread frame
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read the next frame.
    ///
    /// Once `EndOfStream` or `Corrupt` has been returned, every further call
    /// returns `EndOfStream`; reopen the source to read again.
    pub fn next_record(&mut self) -> Result<NextRecord, PersistenceError> {
        if self.finished {
            return Ok(NextRecord::EndOfStream);
        }

        let outcome = self.read_frame();
        if !matches!(outcome, Ok(NextRecord::Record(_))) {
            self.finished = true;
        }
        outcome
    }

    fn read_frame(&mut self) -> Result<NextRecord, PersistenceError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        if !fill(&mut self.source, &mut header_bytes)? {
            return Ok(NextRecord::EndOfStream);
        }
        let header = FrameHeader::parse(&header_bytes);

        // Grows with the data actually present, so a garbage length cannot
        // force a huge allocation up front
        let mut body = Vec::new();
        let want = u64::from(header.body_len);
        let got = (&mut self.source)
            .take(want)
            .read_to_end(&mut body)
            .map_err(PersistenceError::io("read snapshot"))?;
        if (got as u64) < want {
            return Ok(NextRecord::EndOfStream);
        }

        let frame_start = self.position;
        match decode_body(header, &body, frame_start, self.factory.as_ref()) {
            Ok(record) => {
                self.position += HEADER_SIZE + body.len();
                Ok(NextRecord::Record(record))
            }
            Err(corrupt) => Ok(NextRecord::Corrupt(corrupt)),
        }
    }
}

/// Fill `buf` completely. Returns false on a clean or partial EOF.
fn fill<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<bool, PersistenceError> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PersistenceError::io("read snapshot")(e)),
        }
    }
    Ok(true)
}
