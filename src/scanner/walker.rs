//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! [`Walker`] traverses a root directory recursively, keeps entries whose
//! extension is in [`SUPPORTED_EXTENSIONS`](super::SUPPORTED_EXTENSIONS),
//! and validates each candidate with a header-only [`probe`]. Candidates
//! that fail validation are yielded as [`ScanError`] warnings rather than
//! stopping the walk.
//!
//! When symlinks are followed, a link and its target (or two hardlinks)
//! name the same file. [`Walker::scan`] keeps one entry per physical file,
//! preferring the real path, so an alias is never grouped with the file it
//! points at.
//!
//! Result ordering carries no meaning; downstream stages impose their own
//! ordering.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jwalk::WalkDir;

use super::identity::collapse_aliases;
use super::probe::{probe, ProbeError};
use super::{has_supported_extension, ImageFile, ScanConfig, ScanError, ScanOutcome};
use crate::progress::ProgressCallback;

/// Directory walker for parallel image discovery.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Scan configuration
    config: ScanConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress reporting for the "scan" phase
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path, config: ScanConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
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

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`].
    pub fn validate_root(&self) -> Result<(), ScanError> {
        if !self.root.exists() {
            return Err(ScanError::NotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Walk the tree and collect every valid image, one entry per
    /// physical file.
    ///
    /// # Errors
    ///
    /// Only root validation is fatal. Per-entry problems end up in
    /// [`ScanOutcome::warnings`].
    pub fn scan(&self) -> Result<ScanOutcome, ScanError> {
        self.validate_root()?;

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("scan", 0);
        }

        let mut files = Vec::new();
        let mut warnings = Vec::new();
        for entry in self.walk() {
            match entry {
                Ok(file) => {
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(files.len() + 1, file.path.to_string_lossy().as_ref());
                    }
                    files.push(file);
                }
                Err(e) => warnings.push(e),
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("scan");
        }

        let (files, aliases_skipped) = collapse_aliases(files);
        let outcome = ScanOutcome {
            files,
            warnings,
            aliases_skipped,
            interrupted: self.is_shutdown_requested(),
        };

        log::info!(
            "Found {} valid image(s), skipped {}",
            outcome.files.len(),
            outcome.warnings.len()
        );
        if outcome.aliases_skipped > 0 {
            log::info!(
                "Ignored {} link(s) to images already found",
                outcome.aliases_skipped
            );
        }
        Ok(outcome)
    }

    /// Walk the directory tree, yielding validated images.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. The root is not validated and link aliases are not
    /// collapsed here; see [`Walker::scan`].
    pub fn walk(&self) -> impl Iterator<Item = Result<ImageFile, ScanError>> + '_ {
        let excluded = self.config.exclude_dirs.clone();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                if !excluded.is_empty() {
                    children.retain(|child| {
                        child
                            .as_ref()
                            .map_or(true, |e| !excluded.iter().any(|x| e.path() == *x))
                    });
                }
            });

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let path = entry.path();
                    let file_type = entry.file_type();

                    if file_type.is_dir() {
                        return None;
                    }

                    if !has_supported_extension(&path) {
                        log::trace!("Skipping non-image: {}", path.display());
                        return None;
                    }

                    let is_symlink = file_type.is_symlink();
                    if is_symlink && !self.config.follow_symlinks {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    let metadata = match std::fs::metadata(&path) {
                        Ok(m) => m,
                        Err(e) => return Some(Err(self.io_error(path, e))),
                    };
                    if !metadata.is_file() {
                        return None;
                    }

                    Some(
                        self.validate(path, &metadata)
                            .map(|file| file.with_symlink(is_symlink)),
                    )
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    Some(Err(ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    }))
                }
            }
        })
    }

    /// Probe the container and build the scan snapshot.
    fn validate(&self, path: PathBuf, metadata: &Metadata) -> Result<ImageFile, ScanError> {
        match probe(&path) {
            Ok(info) => {
                let modified = metadata.modified().ok();
                let created = metadata.created().ok();
                log::trace!(
                    "Valid {} image {} ({})",
                    super::format_name(info.format),
                    path.display(),
                    info.dimensions
                );
                Ok(
                    ImageFile::new(path, metadata.len(), info.dimensions, info.format)
                        .with_times(modified, created),
                )
            }
            Err(ProbeError::Io(e)) => Err(self.io_error(path, e)),
            Err(e) => {
                log::warn!("Cannot open or validate image {}: {}", path.display(), e);
                Err(ScanError::InvalidImage {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn io_error(&self, path: PathBuf, error: std::io::Error) -> ScanError {
        match error.kind() {
            std::io::ErrorKind::NotFound => {
                log::debug!("File vanished during scan: {}", path.display());
            }
            _ => log::warn!("I/O error for {}: {}", path.display(), error),
        }
        ScanError::Io {
            path,
            source: error,
        }
    }
}
