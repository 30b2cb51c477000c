//! JSON sink for cleanup reports.
//!
//! # Example
//!
//! ```no_run
//! use imgdedupe::actions::{CleanupExecutor, CleanupMode};
//! use imgdedupe::duplicates::DuplicateFinder;
//! use imgdedupe::output::json::{default_report_path, JsonReport};
//! use imgdedupe::output::report::ReportBuilder;
//! use std::path::Path;
//!
//! let (groups, summary) = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("/photos"))
//!     .unwrap();
//! let result = CleanupExecutor::new(&summary.root, CleanupMode::DryRun).execute(&groups);
//! let report = ReportBuilder::new(&summary.root)
//!     .with_scan_summary(&summary)
//!     .build(&result);
//!
//! let path = default_report_path(&summary.root, &report.scan_date);
//! JsonReport::new(&report).save(&path).unwrap();
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::report::CleanupReport;

/// File name prefix of reports written to the default location.
pub const REPORT_PREFIX: &str = "duplicate_cleanup_report_";

/// Default report location: `<root>/duplicate_cleanup_report_<YYYYmmdd_HHMMSS>.json`.
#[must_use]
pub fn default_report_path(root: &Path, date: &DateTime<Local>) -> PathBuf {
    root.join(format!(
        "{REPORT_PREFIX}{}.json",
        date.format("%Y%m%d_%H%M%S")
    ))
}

/// Errors that can occur while producing the JSON report.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The report file could not be written.
    #[error("failed to write report {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// JSON view of a [`CleanupReport`].
#[derive(Debug, Clone, Copy)]
pub struct JsonReport<'a> {
    report: &'a CleanupReport,
}

impl<'a> JsonReport<'a> {
    #[must_use]
    pub fn new(report: &'a CleanupReport) -> Self {
        Self { report }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string(self.report)?)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self.report)?)
    }

    /// Write pretty-printed JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), std::io::Error> {
        serde_json::to_writer_pretty(&mut *writer, self.report)?;
        writer.write_all(b"\n")
    }

    /// Write the report to `path`, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::WriteFailed`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<PathBuf, ReportError> {
        let write_err = |source| ReportError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer).map_err(write_err)?;
        writer.flush().map_err(write_err)?;

        log::info!("Report saved: {}", path.display());
        Ok(path.to_path_buf())
    }
}
