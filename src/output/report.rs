//! Structured cleanup report.
//!
//! [`ReportBuilder`] is a pure aggregation over a [`CleanupResult`] (and,
//! optionally, the detection [`ScanSummary`]). Writing the report is the
//! job of a sink such as [`super::json::JsonReport`].
//!
//! # Schema
//!
//! ```json
//! {
//!   "scan_date": "2024-05-01T12:00:00+02:00",
//!   "target_folder": "/photos",
//!   "mode": "dry_run",
//!   "interrupted": false,
//!   "projected": true,
//!   "duplicate_groups_count": 1,
//!   "total_duplicates_found": 1,
//!   "space_saved_bytes": 2097152,
//!   "space_saved_mb": 2.0,
//!   "space_saved_gb": 0.0,
//!   "cleanup_stats": { "files_scanned": 3, "kept": 1, "removed": 1, ... },
//!   "duplicate_groups": [
//!     { "type": "exact_digest", "count": 2, "files": ["..."], "kept": "...", "reclaimable_bytes": 2097152 }
//!   ],
//!   "outcomes": [
//!     { "path": "...", "group": 0, "status": "would_remove", "size": 2097152 }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::actions::{CleanupResult, FileOutcome, FileStatus, PlannedGroup};
use crate::duplicates::{GroupKind, ScanSummary};

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Counters describing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStats {
    /// Valid images found under the root
    pub files_scanned: usize,
    /// Entries skipped during the walk
    pub files_skipped: usize,
    /// Images with a failed digest or metadata read
    pub fingerprint_failures: usize,
    /// Symlinks and hardlinks to images already scanned
    #[serde(default)]
    pub links_ignored: usize,
    /// Keepers
    pub kept: usize,
    /// Files removed (apply) or that would be removed (dry run)
    pub removed: usize,
    /// Failed backups or deletions
    pub failed: usize,
    /// Candidates not processed because of shutdown
    pub skipped: usize,
}

/// One duplicate group as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Tier that established the group
    #[serde(rename = "type")]
    pub kind: GroupKind,
    /// Number of member files
    pub count: usize,
    /// Member paths, sorted
    pub files: Vec<String>,
    /// Path of the keeper
    pub kept: String,
    /// Scan-time size of the removal candidates
    pub reclaimable_bytes: u64,
}

impl GroupSummary {
    fn from_planned(group: &PlannedGroup) -> Self {
        Self {
            kind: group.kind,
            count: group.member_count(),
            files: group.paths().iter().map(|p| display_path(p)).collect(),
            kept: display_path(&group.keeper.path),
            reclaimable_bytes: group.reclaimable_bytes(),
        }
    }
}

/// One per-file outcome as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub path: String,
    pub group: usize,
    pub status: FileStatus,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&FileOutcome> for OutcomeRecord {
    fn from(outcome: &FileOutcome) -> Self {
        Self {
            path: display_path(&outcome.path),
            group: outcome.group,
            status: outcome.status,
            size: outcome.size,
            backup_path: outcome.backup_path.as_deref().map(display_path),
            error: outcome.error.clone(),
        }
    }
}

/// Complete cleanup report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// When the report was produced
    pub scan_date: DateTime<Local>,
    /// Scanned root
    pub target_folder: String,
    /// `dry_run` or `apply`
    pub mode: String,
    /// Whether shutdown cut the cleanup short
    pub interrupted: bool,
    /// Whether the byte figures are projections (dry run)
    pub projected: bool,
    pub duplicate_groups_count: usize,
    /// Sum of (group size - 1)
    pub total_duplicates_found: usize,
    pub space_saved_bytes: u64,
    pub space_saved_mb: f64,
    pub space_saved_gb: f64,
    pub cleanup_stats: CleanupStats,
    pub duplicate_groups: Vec<GroupSummary>,
    pub outcomes: Vec<OutcomeRecord>,
}

/// Builds a [`CleanupReport`].
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    root: PathBuf,
    scan_date: DateTime<Local>,
    stats: CleanupStats,
}

impl ReportBuilder {
    /// Start a report for `root`, dated now.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scan_date: Local::now(),
            stats: CleanupStats::default(),
        }
    }

    /// Override the report date.
    #[must_use]
    pub fn with_scan_date(mut self, date: DateTime<Local>) -> Self {
        self.scan_date = date;
        self
    }

    /// Take scan counters from the detection summary.
    #[must_use]
    pub fn with_scan_summary(mut self, summary: &ScanSummary) -> Self {
        self.stats.files_scanned = summary.total_files;
        self.stats.files_skipped = summary.skipped_files();
        self.stats.fingerprint_failures = summary.fingerprint_failures;
        self.stats.links_ignored = summary.aliases_skipped;
        self
    }

    /// Aggregate a cleanup result into a report.
    #[must_use]
    pub fn build(&self, result: &CleanupResult) -> CleanupReport {
        let bytes = result.bytes_reclaimed;
        let stats = CleanupStats {
            kept: result.kept_count(),
            removed: result.removed_count(),
            failed: result.failed_count(),
            skipped: result.skipped_count(),
            ..self.stats.clone()
        };

        CleanupReport {
            scan_date: self.scan_date,
            target_folder: display_path(&self.root),
            mode: result.mode.as_str().to_string(),
            interrupted: result.interrupted,
            projected: result.mode.is_dry_run(),
            duplicate_groups_count: result.plan.groups.len(),
            total_duplicates_found: result.plan.removal_count(),
            space_saved_bytes: bytes,
            space_saved_mb: round2(bytes as f64 / MIB),
            space_saved_gb: round2(bytes as f64 / GIB),
            cleanup_stats: stats,
            duplicate_groups: result
                .plan
                .groups
                .iter()
                .map(GroupSummary::from_planned)
                .collect(),
            outcomes: result.outcomes.iter().map(OutcomeRecord::from).collect(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
