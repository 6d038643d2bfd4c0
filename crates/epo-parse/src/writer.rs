//! Mutex-guarded CSV output.
//!
//! One writer owns the output file for the whole run. Appends and flushes
//! take the same mutex; the lock is held for a single row at a time, so
//! parsing parallelizes while serialization does not.

use crate::error::Result;
use crate::record::CsvRow;
use parking_lot::Mutex;
use std::fs::File;
use std::path::Path;

const HEADER: [&str; 5] = ["patent_id", "status", "cpc_list", "citations", "family_patents"];

/// Single-writer CSV sink.
pub struct RowWriter {
    inner: Mutex<csv::Writer<File>>,
}

impl std::fmt::Debug for RowWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowWriter").finish_non_exhaustive()
    }
}

impl RowWriter {
    /// Truncate-create the output file and write the header row.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or the header written.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| crate::ParseError::io(path, &e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(HEADER)?;
        Ok(Self {
            inner: Mutex::new(writer),
        })
    }

    /// Append one row.
    ///
    /// # Errors
    /// Returns error if serialization or the underlying write fails.
    pub fn append(&self, row: &CsvRow) -> Result<()> {
        let mut writer = self.inner.lock();
        writer.write_record([
            row.patent_id.as_str(),
            row.status.as_str(),
            row.cpc_list.as_str(),
            row.citations.as_str(),
            row.family_patents.as_str(),
        ])?;
        Ok(())
    }

    /// Drain the buffer to disk.
    ///
    /// # Errors
    /// Returns error if the underlying writer fails; flush errors are
    /// terminal for the stage.
    pub fn flush(&self) -> Result<()> {
        let mut writer = self.inner.lock();
        writer
            .flush()
            .map_err(|e| crate::ParseError::CsvWrite(e.to_string()))
    }
}
