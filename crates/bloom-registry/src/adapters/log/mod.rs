//! # Snapshot Log
//!
//! Append-only sequence of checksummed record frames with no file-level
//! header or footer. Recovery is purely sequential.

mod reader;
mod record;
mod writer;

pub use reader::{LogReader, NextRecord};
pub use record::{encode_frame, encode_record, FilterRecord, FrameHeader, HEADER_SIZE, MAGIC};
pub use writer::LogWriter;
