//! Reporting for cleanup runs.
//!
//! - [`report`] aggregates a cleanup result into a [`CleanupReport`]
//! - [`json`] writes that report to disk
//! - [`summary`] renders it for the terminal
//!
//! # Example
//!
//! ```no_run
//! use imgdedupe::actions::{CleanupExecutor, CleanupMode};
//! use imgdedupe::duplicates::DuplicateFinder;
//! use imgdedupe::output::{JsonReport, ReportBuilder};
//! use std::path::Path;
//!
//! let (groups, summary) = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("/photos"))
//!     .unwrap();
//! let result = CleanupExecutor::new(&summary.root, CleanupMode::DryRun).execute(&groups);
//! let report = ReportBuilder::new(&summary.root).build(&result);
//! println!("{}", JsonReport::new(&report).to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod report;
pub mod summary;

pub use json::{default_report_path, JsonReport, ReportError};
pub use report::{CleanupReport, CleanupStats, GroupSummary, OutcomeRecord, ReportBuilder};
pub use summary::{print_summary, write_groups, write_summary, ReportStatus};
