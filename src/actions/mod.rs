//! File actions module.
//!
//! This module turns confirmed duplicate groups into filesystem changes:
//! - Planning: one keeper per group, everything else is a removal candidate
//! - Dry run: the full plan with projected reclaimed bytes, no mutation
//! - Apply: optional mirrored backup, change verification, then deletion
//!
//! Per-file failures are recorded as outcomes and never abort the run.
//!
//! ```no_run
//! use imgdedupe::actions::{CleanupExecutor, CleanupMode};
//! use imgdedupe::duplicates::DuplicateFinder;
//! use std::path::Path;
//!
//! let (groups, summary) = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("/photos"))
//!     .unwrap();
//! let result = CleanupExecutor::new(summary.root, CleanupMode::DryRun).execute(&groups);
//! println!("Would reclaim {} bytes", result.bytes_reclaimed);
//! ```

pub mod cleanup;

pub use cleanup::{
    backup_destination, copy_to_backup, CleanupError, CleanupExecutor, CleanupMode, CleanupPlan,
    CleanupResult, FileOutcome, FileSnapshot, FileStatus, PlannedGroup,
};
