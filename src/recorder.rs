use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::drivers::AcquisitionError;
use crate::types::ExportRow;

pub const CSV_HEADER: &str = "elapsed_ms,ch1_raw,ch1_volts,ch2_raw,ch2_volts,repetition";

/// Writes calibrated rows to one CSV file per gesture.
pub struct DataRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    rows: usize,
}

impl DataRecorder {
    /// Creates (or truncates) `path` and writes the header.
    pub fn create(path: &Path) -> Result<Self, AcquisitionError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{CSV_HEADER}")?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn write_record(&mut self, row: &ExportRow) -> Result<(), AcquisitionError> {
        writeln!(
            self.writer,
            "{},{},{},{},{},{}",
            row.elapsed_ms, row.ch1_raw, row.ch1_volts, row.ch2_raw, row.ch2_volts, row.repetition
        )?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes to disk and returns the number of data rows written.
    pub fn finish(mut self) -> Result<usize, AcquisitionError> {
        self.writer.flush()?;
        log::debug!("wrote {} rows to {}", self.rows, self.path.display());
        Ok(self.rows)
    }
}

/// Whole-table convenience wrapper around [`DataRecorder`].
pub fn write_table(path: &Path, rows: &[ExportRow]) -> Result<usize, AcquisitionError> {
    let mut recorder = DataRecorder::create(path)?;
    for row in rows {
        recorder.write_record(row)?;
    }
    recorder.finish()
}
