//! CSV report sink.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Local};
use log::info;

use super::{HEADER, Report};
use crate::error::ReportError;

/// Prefix of generated report files.
const FILE_PREFIX: &str = "port_profiles_summary";

/// Encode `report` as CSV with a header row.
pub fn write_report<W: Write>(report: &Report, writer: W) -> Result<(), ReportError> {
    let mut wtr = ::csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for row in report.rows() {
        wtr.write_record(row.cells())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one timestamped CSV file per run into a directory.
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    output_dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// File name for a report generated at `at`.
    pub fn file_name(at: &DateTime<Local>) -> String {
        format!("{}_{}.csv", FILE_PREFIX, at.format("%Y%m%d_%H%M%S"))
    }

    /// Write the report and return the path of the new file.
    ///
    /// Never overwrites: a second report in the same second gets a numeric
    /// suffix.
    pub fn write(&self, report: &Report, at: &DateTime<Local>) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(&self.output_dir)?;
        let (path, file) = self.create_unique(&Self::file_name(at))?;

        write_report(report, io::BufWriter::new(file))?;
        info!("CSV report saved to: {}", path.display());
        info!("Total rows: {}", report.len());
        Ok(path)
    }

    fn create_unique(&self, name: &str) -> io::Result<(PathBuf, File)> {
        let stem = name.trim_end_matches(".csv");
        let mut path = self.output_dir.join(name);
        for attempt in 1.. {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 100 => {
                    path = self.output_dir.join(format!("{}_{}.csv", stem, attempt));
                }
                Err(e) => return Err(e),
            }
        }
        unreachable!("attempt counter is unbounded")
    }
}
