//! Cleanup planning and execution.
//!
//! # Overview
//!
//! [`CleanupPlan::build`] picks one keeper per group (see
//! [`crate::duplicates::keeper`]); every other member is a removal
//! candidate. [`CleanupExecutor`] then runs the plan in one of two modes:
//!
//! - [`CleanupMode::DryRun`]: nothing on disk changes; reclaimed bytes are
//!   the projected sizes of the candidates.
//! - [`CleanupMode::Apply`]: for each candidate, optionally verify it is
//!   unchanged since the scan, optionally copy it to a mirrored path under
//!   the backup root, then delete it. Reclaimed bytes are the sizes observed
//!   right before deletion.
//!
//! # Safety
//!
//! - The keeper of a group is never touched, and a candidate that is the
//!   keeper's own file under another name (symlink or hardlink) is refused.
//! - Reclaimed bytes only count deletions that release data; removing a
//!   symlink or one of several hardlinks counts as zero.
//! - With a backup root, a file is deleted only after its copy exists and
//!   has the source's byte length.
//! - Every per-file failure becomes a [`FileOutcome`]; the run continues.
//! - On shutdown, no further deletions start. Remaining candidates are
//!   recorded as [`FileStatus::Skipped`].

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::{select_keeper, DuplicateGroup, GroupKind};
use crate::progress::ProgressCallback;
use crate::scanner::{frees_space, same_file, ImageFile};

/// How the executor treats removal candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupMode {
    /// Plan only; the filesystem is not modified.
    #[default]
    DryRun,
    /// Back up (optionally) and delete removal candidates.
    Apply,
}

impl CleanupMode {
    /// Name used in reports (`dry_run` or `apply`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Apply => "apply",
        }
    }

    #[must_use]
    pub fn is_dry_run(self) -> bool {
        self == Self::DryRun
    }
}

impl std::fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for cleanup operations on a single file.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// Copying the file to the backup root failed.
    #[error("backup failed for {path} -> {backup}: {source}")]
    BackupFailed {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backup copy does not have the source's byte length.
    #[error("backup of {path} is incomplete: expected {expected} bytes, found {actual}")]
    BackupIncomplete {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The mirrored backup path would overwrite the file itself.
    #[error("backup destination for {0} is the file itself")]
    BackupOverlapsSource(PathBuf),

    /// The file does not live under the scanned root, so it cannot be mirrored.
    #[error("{path} is outside the scanned root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// Removing the file failed.
    #[error("delete failed for {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File was modified since scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The candidate and the keeper are the same file on disk.
    #[error("{path} is the same file as the kept {keeper}")]
    SameFileAsKeeper { path: PathBuf, keeper: PathBuf },

    /// File was not found (deleted or moved since the scan).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Shutdown was requested before this file was processed.
    #[error("cleanup interrupted before {0}")]
    Interrupted(PathBuf),
}

impl CleanupError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::BackupFailed { path, .. }
            | Self::BackupIncomplete { path, .. }
            | Self::OutsideRoot { path, .. }
            | Self::SameFileAsKeeper { path, .. }
            | Self::DeleteFailed { path, .. } => path,
            Self::BackupOverlapsSource(p)
            | Self::Modified(p)
            | Self::NotFound(p)
            | Self::Interrupted(p) => p,
        }
    }

    /// Outcome status recorded for a file that hit this error.
    #[must_use]
    pub fn status(&self) -> FileStatus {
        match self {
            Self::BackupFailed { .. }
            | Self::BackupIncomplete { .. }
            | Self::BackupOverlapsSource(_)
            | Self::OutsideRoot { .. } => FileStatus::BackupFailed,
            Self::DeleteFailed { .. }
            | Self::Modified(_)
            | Self::NotFound(_)
            | Self::SameFileAsKeeper { .. } => FileStatus::DeleteFailed,
            Self::Interrupted(_) => FileStatus::Skipped,
        }
    }
}

/// File metadata snapshot for change verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSnapshot {
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Snapshot recorded when the file was scanned.
    #[must_use]
    pub fn of(file: &ImageFile) -> Self {
        Self {
            size: file.size,
            mtime: file.modified,
        }
    }

    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, CleanupError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CleanupError::NotFound(path.to_path_buf()),
            _ => CleanupError::DeleteFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        Ok(Self {
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Whether `current` still matches this snapshot.
    ///
    /// Modification times are only compared when both are known.
    #[must_use]
    pub fn matches(&self, current: &Self) -> bool {
        if self.size != current.size {
            return false;
        }
        match (self.mtime, current.mtime) {
            (Some(before), Some(now)) => before == now,
            _ => true,
        }
    }
}

/// Keeper and removal candidates for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedGroup {
    /// Index of the group in detection order
    pub index: usize,
    /// Tier that established the group
    pub kind: GroupKind,
    /// File that survives cleanup
    pub keeper: ImageFile,
    /// Files to remove, sorted by path
    pub removals: Vec<ImageFile>,
}

impl PlannedGroup {
    /// Scan-time size of all removal candidates.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.removals.iter().map(|f| f.size).sum()
    }

    /// Number of files in the group, keeper included.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.removals.len() + 1
    }

    /// All member paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = std::iter::once(&self.keeper)
            .chain(&self.removals)
            .map(|f| f.path.clone())
            .collect();
        paths.sort();
        paths
    }
}

/// Keeper selection for every group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
    /// Planned groups in detection order
    pub groups: Vec<PlannedGroup>,
}

impl CleanupPlan {
    /// Build the plan using the fresh-stat retention policy.
    #[must_use]
    pub fn build(groups: &[DuplicateGroup]) -> Self {
        Self::build_with(groups, select_keeper)
    }

    /// Build the plan with a custom keeper selector.
    ///
    /// Groups for which `select` returns `None` are left out.
    pub fn build_with<F>(groups: &[DuplicateGroup], select: F) -> Self
    where
        F: Fn(&DuplicateGroup) -> Option<&ImageFile>,
    {
        let planned = groups
            .iter()
            .enumerate()
            .filter_map(|(index, group)| {
                let keeper = select(group)?.clone();
                let removals: Vec<ImageFile> = group
                    .files
                    .iter()
                    .filter(|f| f.path != keeper.path)
                    .cloned()
                    .collect();
                debug_assert_eq!(removals.len() + 1, group.len());
                log::debug!(
                    "Group {} ({}): keeping {}, {} removal(s)",
                    index,
                    group.kind,
                    keeper.path.display(),
                    removals.len()
                );
                Some(PlannedGroup {
                    index,
                    kind: group.kind,
                    keeper,
                    removals,
                })
            })
            .collect();
        Self { groups: planned }
    }

    /// Total number of removal candidates.
    #[must_use]
    pub fn removal_count(&self) -> usize {
        self.groups.iter().map(|g| g.removals.len()).sum()
    }

    /// Projected reclaimed bytes (scan-time sizes of all candidates).
    #[must_use]
    pub fn projected_bytes(&self) -> u64 {
        self.groups.iter().map(PlannedGroup::reclaimable_bytes).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Keeper of its group
    Kept,
    /// Removal candidate in a dry run
    WouldRemove,
    /// Deleted (after a successful backup, if requested)
    Removed,
    /// Backup failed; the file is still on disk
    BackupFailed,
    /// Deletion failed or was refused; the file is still on disk
    DeleteFailed,
    /// Not processed because of shutdown
    Skipped,
}

impl FileStatus {
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(self, Self::BackupFailed | Self::DeleteFailed)
    }
}

/// Per-file outcome of a cleanup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// File path
    pub path: PathBuf,
    /// Index of the owning group
    pub group: usize,
    /// Final status
    pub status: FileStatus,
    /// Bytes: pre-deletion size for removed files, scan size otherwise
    pub size: u64,
    /// Backup copy, if one was made
    pub backup_path: Option<PathBuf>,
    /// Error message for failed or skipped files
    pub error: Option<String>,
}

impl FileOutcome {
    fn new(file: &ImageFile, group: usize, status: FileStatus) -> Self {
        Self {
            path: file.path.clone(),
            group,
            status,
            size: file.size,
            backup_path: None,
            error: None,
        }
    }

    fn failed(file: &ImageFile, group: usize, error: &CleanupError, backup: Option<PathBuf>) -> Self {
        Self {
            backup_path: backup,
            error: Some(error.to_string()),
            ..Self::new(file, group, error.status())
        }
    }
}

/// Result of executing a plan.
#[derive(Debug, Clone)]
pub struct CleanupResult {
    /// Mode the plan was executed in
    pub mode: CleanupMode,
    /// The executed plan
    pub plan: CleanupPlan,
    /// One outcome per group member, in plan order
    pub outcomes: Vec<FileOutcome>,
    /// Bytes freed (apply) or projected (dry run)
    pub bytes_reclaimed: u64,
    /// Whether shutdown stopped the run early
    pub interrupted: bool,
}

impl CleanupResult {
    fn count(&self, status: FileStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    #[must_use]
    pub fn kept_count(&self) -> usize {
        self.count(FileStatus::Kept)
    }

    /// Files deleted (apply) or that would be deleted (dry run).
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.count(FileStatus::Removed) + self.count(FileStatus::WouldRemove)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failure()).count()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(FileStatus::Skipped)
    }
}

/// Map a file under `source_root` to its mirrored path under `backup_root`.
///
/// # Errors
///
/// Returns [`CleanupError::OutsideRoot`] if `path` is not under `source_root`.
pub fn backup_destination(
    path: &Path,
    source_root: &Path,
    backup_root: &Path,
) -> Result<PathBuf, CleanupError> {
    let relative = path
        .strip_prefix(source_root)
        .map_err(|_| CleanupError::OutsideRoot {
            path: path.to_path_buf(),
            root: source_root.to_path_buf(),
        })?;
    Ok(backup_root.join(relative))
}

/// Copy `path` to its mirrored location under `backup_root`.
///
/// Parent directories are created as needed and an existing copy is
/// overwritten. The copy keeps the source's modification time where the
/// platform allows it.
///
/// # Errors
///
/// Returns a backup error if the copy cannot be made or its length differs
/// from the source.
pub fn copy_to_backup(
    path: &Path,
    source_root: &Path,
    backup_root: &Path,
) -> Result<PathBuf, CleanupError> {
    let destination = backup_destination(path, source_root, backup_root)?;
    if destination == path {
        return Err(CleanupError::BackupOverlapsSource(path.to_path_buf()));
    }
    let backup_err = |source: io::Error| CleanupError::BackupFailed {
        path: path.to_path_buf(),
        backup: destination.clone(),
        source,
    };

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(backup_err)?;
    }

    let source_meta = fs::metadata(path).map_err(backup_err)?;
    fs::copy(path, &destination).map_err(backup_err)?;

    let written = fs::metadata(&destination).map_err(backup_err)?.len();
    if written != source_meta.len() {
        return Err(CleanupError::BackupIncomplete {
            path: path.to_path_buf(),
            expected: source_meta.len(),
            actual: written,
        });
    }

    if let Ok(mtime) = source_meta.modified() {
        let preserved = File::options()
            .write(true)
            .open(&destination)
            .and_then(|f| f.set_modified(mtime));
        if let Err(e) = preserved {
            log::debug!(
                "Could not preserve mtime on {}: {}",
                destination.display(),
                e
            );
        }
    }

    log::debug!("Backed up {} -> {}", path.display(), destination.display());
    Ok(destination)
}

/// Executes a [`CleanupPlan`].
pub struct CleanupExecutor {
    mode: CleanupMode,
    source_root: PathBuf,
    backup_root: Option<PathBuf>,
    verify_unchanged: bool,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for CleanupExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupExecutor")
            .field("mode", &self.mode)
            .field("source_root", &self.source_root)
            .field("backup_root", &self.backup_root)
            .field("verify_unchanged", &self.verify_unchanged)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl CleanupExecutor {
    /// Create an executor for files scanned under `source_root`.
    ///
    /// Change verification is enabled and no backup root is set.
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, mode: CleanupMode) -> Self {
        Self {
            mode,
            source_root: source_root.into(),
            backup_root: None,
            verify_unchanged: true,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Copy removal candidates under `root` before deleting them.
    #[must_use]
    pub fn with_backup_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.backup_root = Some(root.into());
        self
    }

    /// Re-stat files before deleting and refuse if they changed.
    #[must_use]
    pub fn with_verify_unchanged(mut self, verify: bool) -> Self {
        self.verify_unchanged = verify;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    #[must_use]
    pub fn mode(&self) -> CleanupMode {
        self.mode
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Plan and execute cleanup for `groups`.
    #[must_use]
    pub fn execute(&self, groups: &[DuplicateGroup]) -> CleanupResult {
        self.execute_plan(CleanupPlan::build(groups))
    }

    /// Execute an existing plan.
    #[must_use]
    pub fn execute_plan(&self, plan: CleanupPlan) -> CleanupResult {
        match self.mode {
            CleanupMode::DryRun => self.dry_run(plan),
            CleanupMode::Apply => self.apply(plan),
        }
    }

    fn dry_run(&self, plan: CleanupPlan) -> CleanupResult {
        let mut outcomes = Vec::with_capacity(plan.removal_count() + plan.groups.len());
        for group in &plan.groups {
            outcomes.push(FileOutcome::new(&group.keeper, group.index, FileStatus::Kept));
            for file in &group.removals {
                log::debug!("Would remove {}", file.path.display());
                outcomes.push(FileOutcome::new(file, group.index, FileStatus::WouldRemove));
            }
        }

        let bytes_reclaimed = plan.projected_bytes();
        log::info!(
            "Dry run: {} file(s) would be removed, {} bytes reclaimable",
            plan.removal_count(),
            bytes_reclaimed
        );

        CleanupResult {
            mode: CleanupMode::DryRun,
            plan,
            outcomes,
            bytes_reclaimed,
            interrupted: false,
        }
    }

    fn apply(&self, plan: CleanupPlan) -> CleanupResult {
        let total = plan.removal_count();
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("cleanup", total);
        }

        let mut outcomes = Vec::with_capacity(total + plan.groups.len());
        let mut bytes_reclaimed = 0;
        let mut interrupted = false;
        let mut processed = 0;

        for group in &plan.groups {
            outcomes.push(FileOutcome::new(&group.keeper, group.index, FileStatus::Kept));

            for file in &group.removals {
                if interrupted || self.is_shutdown_requested() {
                    if !interrupted {
                        log::warn!("Shutdown requested, skipping remaining deletions");
                    }
                    interrupted = true;
                    let error = CleanupError::Interrupted(file.path.clone());
                    outcomes.push(FileOutcome::failed(file, group.index, &error, None));
                    continue;
                }

                let outcome = self.remove(group, file);
                match outcome.status {
                    FileStatus::Removed => bytes_reclaimed += outcome.size,
                    _ => log::error!(
                        "{}",
                        outcome.error.as_deref().unwrap_or("cleanup failed")
                    ),
                }
                outcomes.push(outcome);

                processed += 1;
                if let Some(ref callback) = self.progress_callback {
                    callback.on_progress(processed, file.path.to_string_lossy().as_ref());
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("cleanup");
        }

        let result = CleanupResult {
            mode: CleanupMode::Apply,
            plan,
            outcomes,
            bytes_reclaimed,
            interrupted,
        };
        log::info!(
            "Cleanup: {} removed, {} failed, {} skipped, {} bytes reclaimed",
            result.removed_count(),
            result.failed_count(),
            result.skipped_count(),
            result.bytes_reclaimed
        );
        result
    }

    /// Verify, back up and delete one candidate.
    fn remove(&self, planned: &PlannedGroup, file: &ImageFile) -> FileOutcome {
        let group = planned.index;
        if same_file(&file.path, &planned.keeper.path) {
            log::warn!(
                "Not removing {}: same file as kept {}",
                file.path.display(),
                planned.keeper.path.display()
            );
            let error = CleanupError::SameFileAsKeeper {
                path: file.path.clone(),
                keeper: planned.keeper.path.clone(),
            };
            return FileOutcome::failed(file, group, &error, None);
        }

        let current = match FileSnapshot::capture(&file.path) {
            Ok(snapshot) => snapshot,
            Err(e) => return FileOutcome::failed(file, group, &e, None),
        };

        if self.verify_unchanged && !FileSnapshot::of(file).matches(&current) {
            log::warn!("File modified since scan: {}", file.path.display());
            let error = CleanupError::Modified(file.path.clone());
            return FileOutcome::failed(file, group, &error, None);
        }

        let backup = match self.backup_root {
            Some(ref root) => match copy_to_backup(&file.path, &self.source_root, root) {
                Ok(path) => Some(path),
                Err(e) => return FileOutcome::failed(file, group, &e, None),
            },
            None => None,
        };

        let releases = frees_space(&file.path);
        match fs::remove_file(&file.path) {
            Ok(()) => {
                log::debug!("Removed {}", file.path.display());
                if !releases {
                    log::debug!("{} was a link; no space released", file.path.display());
                }
                FileOutcome {
                    size: if releases { current.size } else { 0 },
                    backup_path: backup,
                    ..FileOutcome::new(file, group, FileStatus::Removed)
                }
            }
            Err(source) => {
                let error = CleanupError::DeleteFailed {
                    path: file.path.clone(),
                    source,
                };
                FileOutcome::failed(file, group, &error, backup)
            }
        }
    }
}
