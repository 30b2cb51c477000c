//! Duplicate finder implementation with tiered detection.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Walk**: collect valid images under the root (see [`crate::scanner::walker`])
//! 2. **Fingerprint**: digest and metadata for every image on the worker pool
//! 3. **Exact digest tier**: group byte-identical files
//! 4. **Perceptual pass**: codes for metadata-tier candidates (optional)
//! 5. **Pixel content tier**: verify `(dimensions, size)` buckets pairwise
//!
//! # Example
//!
//! ```no_run
//! use imgdedupe::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let config = FinderConfig::default().with_io_threads(4);
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
//!
//! println!("Found {} duplicate groups", summary.duplicate_groups);
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::compare::Comparator;
use super::groups::{exact_digest_tier, metadata_buckets, metadata_tier, GroupingState};
use super::{DuplicateGroup, GroupKind};
use crate::progress::ProgressCallback;
use crate::scanner::fingerprint::DEFAULT_IO_THREADS;
use crate::scanner::{Fingerprinter, Hasher, ImageFile, ScanConfig, ScanError, Walker};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of fingerprinting workers.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Walker configuration for directory traversal.
    pub scan_config: ScanConfig,
    /// Reject metadata-tier pairs whose perceptual codes differ before decoding.
    pub perceptual_prefilter: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("scan_config", &self.scan_config)
            .field("perceptual_prefilter", &self.perceptual_prefilter)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            scan_config: ScanConfig::default(),
            perceptual_prefilter: true,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of fingerprinting workers (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// Enable or disable the perceptual pre-filter.
    #[must_use]
    pub fn with_perceptual_prefilter(mut self, enabled: bool) -> Self {
        self.perceptual_prefilter = enabled;
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

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Canonical root that was scanned
    pub root: PathBuf,
    /// Number of valid images found
    pub total_files: usize,
    /// Total size of all valid images in bytes
    pub total_size: u64,
    /// Entries skipped during the walk (invalid or unreadable)
    pub skipped: Vec<ScanError>,
    /// Symlinks and hardlinks ignored because their file was already found
    pub aliases_skipped: usize,
    /// Files whose content digest could not be computed
    pub digest_failures: usize,
    /// Files whose metadata could not be extracted
    pub metadata_failures: usize,
    /// Files with at least one failed fingerprint component
    pub fingerprint_failures: usize,
    /// Files that entered the metadata tier
    pub pixel_candidates: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Groups established by the exact digest tier
    pub exact_digest_groups: usize,
    /// Groups established by the pixel content tier
    pub pixel_content_groups: usize,
    /// Total number of duplicate files (excluding one keeper per group)
    pub duplicate_files: usize,
    /// Space held by duplicates, assuming the largest member of each group is kept
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Number of files skipped during the walk.
    #[must_use]
    pub fn skipped_files(&self) -> usize {
        self.skipped.len()
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root could not be resolved.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The fingerprinting pool could not be started.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl FinderError {
    /// Whether the error is caused by an unusable root directory.
    #[must_use]
    pub fn is_invalid_root(&self) -> bool {
        matches!(self, Self::PathNotFound(_) | Self::NotADirectory(_))
    }
}

/// Duplicate finder that orchestrates the tiered detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find all duplicate images under `path`.
    ///
    /// Returns groups ordered exact-digest first, then pixel content, each
    /// tier sorted by smallest member path.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist or is not a directory
    /// - The path cannot be canonicalized
    /// - The scan is interrupted by shutdown signal
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }
        let root = path.canonicalize().map_err(|source| FinderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Starting duplicate scan of {}", root.display());

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let mut walker = Walker::new(&root, self.config.scan_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            walker = walker.with_progress_callback(Arc::clone(callback));
        }

        let outcome = walker.scan().map_err(|e| match e {
            ScanError::NotFound(p) => FinderError::PathNotFound(p),
            ScanError::NotADirectory(p) => FinderError::NotADirectory(p),
            ScanError::Io { path, source } => FinderError::Io { path, source },
            other => FinderError::Io {
                path: other.path().to_path_buf(),
                source: std::io::Error::other(other.to_string()),
            },
        })?;

        if outcome.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let files = outcome.files;
        let skipped = outcome.warnings;
        let aliases_skipped = outcome.aliases_skipped;

        let (groups, mut summary) = self.find_duplicates_from_files(files)?;
        summary.root = root;
        summary.skipped = skipped;
        summary.aliases_skipped = aliases_skipped;
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((groups, summary))
    }

    /// Find duplicates among an already collected list of images.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] on shutdown and
    /// [`FinderError::ThreadPool`] if the worker pool cannot start.
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<ImageFile>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary {
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            ..ScanSummary::default()
        };

        if files.len() < 2 {
            log::info!("Fewer than two images, nothing to compare");
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        let mut fingerprinter = Fingerprinter::new(self.config.io_threads)?;
        let mut hasher = Hasher::new();
        if let Some(ref flag) = self.config.shutdown_flag {
            fingerprinter = fingerprinter.with_shutdown_flag(Arc::clone(flag));
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            fingerprinter = fingerprinter.with_progress_callback(Arc::clone(callback));
        }

        let mut set = fingerprinter.fingerprint_all(files);
        if set.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }
        summary.digest_failures = set.digest_failures();
        summary.metadata_failures = set.metadata_failures();
        summary.fingerprint_failures = set.failures();

        let mut state = GroupingState::new();
        let mut groups = exact_digest_tier(&set, &mut state);

        let buckets = metadata_buckets(&set, &state);
        let candidates: Vec<PathBuf> = buckets.values().flatten().cloned().collect();
        summary.pixel_candidates = candidates.len();

        if self.config.perceptual_prefilter {
            fingerprinter.compute_perceptual(&mut set, &candidates);
            if set.interrupted {
                return Err(FinderError::Interrupted);
            }
        }

        let comparator = Comparator::new()
            .with_hasher(hasher)
            .with_perceptual_prefilter(self.config.perceptual_prefilter);
        groups.extend(metadata_tier(&set, &buckets, &comparator, &mut state));

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        summary.duplicate_groups = groups.len();
        summary.exact_digest_groups = groups
            .iter()
            .filter(|g| g.kind == GroupKind::ExactDigest)
            .count();
        summary.pixel_content_groups = summary.duplicate_groups - summary.exact_digest_groups;
        summary.duplicate_files = super::total_duplicates(&groups);
        summary.reclaimable_space = groups.iter().map(reclaimable).sum();
        summary.scan_duration = start_time.elapsed();

        Ok((groups, summary))
    }
}

/// Bytes freed by removing every member but the largest.
fn reclaimable(group: &DuplicateGroup) -> u64 {
    let largest = group.files.iter().map(|f| f.size).max().unwrap_or(0);
    group.total_size() - largest
}
