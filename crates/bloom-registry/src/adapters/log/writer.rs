//! # Snapshot Log Writer
//!
//! Appends record frames to a file. `freeze_all` writes a whole registry
//! snapshot and does not return until the bytes are synced to storage.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::PersistenceError;
use crate::ports::Filter;

use super::record::encode_record;

/// Sequential frame writer over a file
pub struct LogWriter {
    out: BufWriter<File>,
    path: PathBuf,
    bytes_written: u64,
    records_written: usize,
}

impl LogWriter {
    /// Create (or truncate) the file at `path`
    pub fn create(path: &Path) -> Result<Self, PersistenceError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(PersistenceError::io("create snapshot"))?;

        Ok(Self {
            out: BufWriter::new(file),
            path: path.to_path_buf(),
            bytes_written: 0,
            records_written: 0,
        })
    }

    /// Append one record frame
    pub fn append(&mut self, name: &str, filter: &dyn Filter) -> Result<(), PersistenceError> {
        let written = encode_record(&mut self.out, name, filter)?;
        self.bytes_written += written as u64;
        self.records_written += 1;
        Ok(())
    }

    /// Flush buffered frames and force them to stable storage
    pub fn sync(&mut self) -> Result<(), PersistenceError> {
        self.out.flush().map_err(PersistenceError::io("flush snapshot"))?;
        self.out
            .get_ref()
            .sync_all()
            .map_err(PersistenceError::io("sync snapshot"))
    }

    /// Write every entry, then sync. Returns the number of records written.
    pub fn freeze_all<I>(mut self, entries: I) -> Result<usize, PersistenceError>
    where
        I: IntoIterator<Item = (String, Arc<dyn Filter>)>,
    {
        for (name, filter) in entries {
            self.append(&name, filter.as_ref())?;
        }
        self.sync()?;

        debug!(
            path = %self.path.display(),
            records = self.records_written,
            bytes = self.bytes_written,
            "[persistence] Snapshot log written"
        );
        Ok(self.records_written)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::infra::ManualClock;
    use crate::adapters::log::reader::{LogReader, NextRecord};
    use crate::domain::{ExpirableBloomFilterFactory, FilterConfigBuilder};
    use crate::ports::FilterFactory;

    fn factory() -> Arc<dyn FilterFactory> {
        Arc::new(ExpirableBloomFilterFactory::new(Arc::new(ManualClock::new(0))))
    }

    fn entry(factory: &Arc<dyn FilterFactory>, name: &str) -> (String, Arc<dyn Filter>) {
        let config = FilterConfigBuilder::new(name)
            .expected_insertions(64)
            .fpp(0.01)
            .build()
            .unwrap();
        let filter = factory.create(&config).unwrap();
        filter.insert(&format!("{}-value", name));
        (name.to_string(), filter)
    }

    #[test]
    fn test_freeze_all_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let factory = factory();
        let entries = vec![entry(&factory, "x"), entry(&factory, "y")];

        let writer = LogWriter::create(&path).unwrap();
        assert_eq!(writer.freeze_all(entries).unwrap(), 2);

        let mut reader = LogReader::open(&path, factory).unwrap();
        let mut names = Vec::new();
        while let NextRecord::Record(record) = reader.next_record().unwrap() {
            assert!(record.filter.might_contain(&format!("{}-value", record.name)));
            names.push(record.name);
        }
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        std::fs::write(&path, vec![0xAB; 1024]).unwrap();

        let writer = LogWriter::create(&path).unwrap();
        assert_eq!(writer.freeze_all(Vec::new()).unwrap(), 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_append_tracks_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let factory = factory();
        let (name, filter) = entry(&factory, "x");

        let mut writer = LogWriter::create(&path).unwrap();
        writer.append(&name, filter.as_ref()).unwrap();
        writer.sync().unwrap();

        assert_eq!(
            writer.bytes_written(),
            std::fs::metadata(&path).unwrap().len()
        );
    }
}
