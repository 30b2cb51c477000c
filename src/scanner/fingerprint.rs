//! Parallel content fingerprinting.
//!
//! # Overview
//!
//! The [`Fingerprinter`] owns a bounded rayon pool (default 4 threads to
//! avoid disk thrashing) and computes, for every scanned image:
//! - a [`ContentDigest`] of the full byte content, and
//! - an [`ImageMetadata`] record (size, pixel dimensions, format).
//!
//! Each task yields its own tagged results; a failure on one file is kept
//! in that file's slot and never propagates to the pool. Results are
//! collected into a [`FingerprintSet`] keyed by path, so nothing downstream
//! depends on the order in which workers finished.
//!
//! A second, optional pass computes [`PerceptualCode`]s for the files that
//! enter the metadata tier.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::ImageFormat;
use rayon::prelude::*;
use serde::Serialize;

use super::hasher::{ContentDigest, Hasher};
use super::perceptual::{PerceptualCode, PerceptualHasher};
use super::probe::{probe, ProbeError};
use super::{Dimensions, FingerprintError, ImageFile};
use crate::progress::ProgressCallback;

/// Default number of fingerprinting workers.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Lightweight per-file metadata read from the filesystem and container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    /// File size in bytes at fingerprint time
    pub size: u64,
    /// Pixel dimensions
    pub dimensions: Dimensions,
    /// Container format
    pub format: ImageFormat,
}

impl ImageMetadata {
    /// Coarse grouping key for the metadata tier.
    #[must_use]
    pub fn key(&self) -> MetadataKey {
        MetadataKey {
            dimensions: self.dimensions,
            size: self.size,
        }
    }
}

/// `(dimensions, byte size)` pair used to bucket candidates whose digests differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetadataKey {
    /// Pixel dimensions
    pub dimensions: Dimensions,
    /// File size in bytes
    pub size: u64,
}

/// Everything computed for one file.
#[derive(Debug)]
pub struct Fingerprint {
    /// Scan-time snapshot of the file
    pub file: ImageFile,
    /// Full-content digest
    pub digest: Result<ContentDigest, FingerprintError>,
    /// Size, dimensions and format
    pub metadata: Result<ImageMetadata, FingerprintError>,
    /// Perceptual code, only computed for metadata-tier candidates
    pub perceptual: Option<Result<PerceptualCode, FingerprintError>>,
}

impl Fingerprint {
    /// Create a fingerprint record without a perceptual code.
    #[must_use]
    pub fn new(
        file: ImageFile,
        digest: Result<ContentDigest, FingerprintError>,
        metadata: Result<ImageMetadata, FingerprintError>,
    ) -> Self {
        Self {
            file,
            digest,
            metadata,
            perceptual: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// The digest, if it was computed successfully.
    #[must_use]
    pub fn digest(&self) -> Option<ContentDigest> {
        self.digest.as_ref().ok().copied()
    }

    /// The metadata-tier key, if metadata was extracted successfully.
    #[must_use]
    pub fn metadata_key(&self) -> Option<MetadataKey> {
        self.metadata.as_ref().ok().map(ImageMetadata::key)
    }

    /// The perceptual code, if one was computed successfully.
    #[must_use]
    pub fn perceptual_code(&self) -> Option<&PerceptualCode> {
        self.perceptual.as_ref().and_then(|r| r.as_ref().ok())
    }
}

/// Fingerprints keyed by absolute path.
///
/// Iteration order is the path order, independent of worker scheduling.
#[derive(Debug, Default)]
pub struct FingerprintSet {
    entries: BTreeMap<PathBuf, Fingerprint>,
    /// Whether some files were skipped because shutdown was requested
    pub interrupted: bool,
}

impl FingerprintSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the fingerprint for its file's path.
    pub fn insert(&mut self, fingerprint: Fingerprint) {
        self.entries
            .insert(fingerprint.file.path.clone(), fingerprint);
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    /// Iterate over fingerprints in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of files whose digest could not be computed.
    #[must_use]
    pub fn digest_failures(&self) -> usize {
        self.entries.values().filter(|f| f.digest.is_err()).count()
    }

    /// Number of files whose metadata could not be extracted.
    #[must_use]
    pub fn metadata_failures(&self) -> usize {
        self.entries.values().filter(|f| f.metadata.is_err()).count()
    }

    /// Number of files with at least one failed component.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.entries
            .values()
            .filter(|f| f.digest.is_err() || f.metadata.is_err())
            .count()
    }

    /// Number of files for which neither digest nor metadata is available.
    #[must_use]
    pub fn unusable(&self) -> usize {
        self.entries
            .values()
            .filter(|f| f.digest.is_err() && f.metadata.is_err())
            .count()
    }

    fn set_perceptual(&mut self, path: &Path, code: Result<PerceptualCode, FingerprintError>) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.perceptual = Some(code);
        }
    }
}

impl FromIterator<Fingerprint> for FingerprintSet {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        let mut set = Self::new();
        for fingerprint in iter {
            set.insert(fingerprint);
        }
        set
    }
}

/// Computes digests, metadata and perceptual codes on a bounded pool.
pub struct Fingerprinter {
    pool: rayon::ThreadPool,
    io_threads: usize,
    hasher: Hasher,
    perceptual: PerceptualHasher,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Fingerprinter {
    /// Create a fingerprinter with `io_threads` workers (minimum 1).
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot be created.
    pub fn new(io_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let io_threads = io_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(io_threads)
            .thread_name(|i| format!("fingerprint-{i}"))
            .build()?;
        Ok(Self {
            pool,
            io_threads,
            hasher: Hasher::new(),
            perceptual: PerceptualHasher::new(),
            shutdown_flag: None,
            progress_callback: None,
        })
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.hasher = self.hasher.with_shutdown_flag(Arc::clone(&flag));
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
    pub fn io_threads(&self) -> usize {
        self.io_threads
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Compute the full-content digest of one file.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Unreadable`] if the file cannot be read.
    pub fn digest(&self, file: &ImageFile) -> Result<ContentDigest, FingerprintError> {
        self.hasher.digest(&file.path)
    }

    /// Read size, dimensions and format of one file, opening the container once.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Unreadable`] if the file cannot be
    /// stat'ed or opened, and [`FingerprintError::DecodeFailed`] if the
    /// container header is invalid.
    pub fn metadata(&self, file: &ImageFile) -> Result<ImageMetadata, FingerprintError> {
        let path = &file.path;
        let size = fs::metadata(path)
            .map_err(|source| FingerprintError::Unreadable {
                path: path.clone(),
                source,
            })?
            .len();

        let info = probe(path).map_err(|e| match e {
            ProbeError::Io(source) => FingerprintError::Unreadable {
                path: path.clone(),
                source,
            },
            other => FingerprintError::DecodeFailed {
                path: path.clone(),
                reason: other.to_string(),
            },
        })?;

        Ok(ImageMetadata {
            size,
            dimensions: info.dimensions,
            format: info.format,
        })
    }

    /// Fingerprint every file on the worker pool.
    ///
    /// Never fails as a whole: per-file errors are stored in the
    /// corresponding [`Fingerprint`]. If shutdown is requested, remaining
    /// files are recorded as interrupted and [`FingerprintSet::interrupted`]
    /// is set.
    pub fn fingerprint_all(&self, files: Vec<ImageFile>) -> FingerprintSet {
        let total = files.len();
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("fingerprint", total);
        }
        log::info!(
            "Fingerprinting {} images with {} worker(s)",
            total,
            self.io_threads
        );

        let done = AtomicUsize::new(0);
        let results: Vec<Fingerprint> = self.pool.install(|| {
            files
                .into_par_iter()
                .map(|file| {
                    if self.is_shutdown_requested() {
                        return Fingerprint::new(
                            file,
                            Err(FingerprintError::Interrupted),
                            Err(FingerprintError::Interrupted),
                        );
                    }

                    let digest = self.digest(&file);
                    if let Err(ref e) = digest {
                        if !matches!(e, FingerprintError::Interrupted) {
                            log::warn!("{e}");
                        }
                    }

                    let metadata = self.metadata(&file);
                    if let Err(ref e) = metadata {
                        log::warn!("{e}");
                    }

                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(current, file.path.to_string_lossy().as_ref());
                    }
                    log::trace!("Fingerprinted {}", file.path.display());

                    Fingerprint::new(file, digest, metadata)
                })
                .collect()
        });

        let mut set: FingerprintSet = results.into_iter().collect();
        set.interrupted = self.is_shutdown_requested();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("fingerprint");
        }
        log::info!(
            "Fingerprinting complete: {} files, {} digest failure(s), {} metadata failure(s)",
            set.len(),
            set.digest_failures(),
            set.metadata_failures()
        );

        set
    }

    /// Compute perceptual codes for `paths` on the worker pool and store
    /// them in `set`.
    pub fn compute_perceptual(&self, set: &mut FingerprintSet, paths: &[PathBuf]) {
        if paths.is_empty() {
            return;
        }
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("perceptual", paths.len());
        }
        log::debug!("Computing perceptual codes for {} candidates", paths.len());

        let done = AtomicUsize::new(0);
        let codes: Vec<(&PathBuf, Result<PerceptualCode, FingerprintError>)> =
            self.pool.install(|| {
                paths
                    .par_iter()
                    .map(|path| {
                        if self.is_shutdown_requested() {
                            return (path, Err(FingerprintError::Interrupted));
                        }
                        let code = self.perceptual.code_for_path(path);
                        if let Err(ref e) = code {
                            log::warn!("{e}");
                        }
                        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Some(ref callback) = self.progress_callback {
                            callback.on_progress(current, path.to_string_lossy().as_ref());
                        }
                        (path, code)
                    })
                    .collect()
            });

        for (path, code) in codes {
            set.set_perceptual(path, code);
        }
        if self.is_shutdown_requested() {
            set.interrupted = true;
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("perceptual");
        }
    }
}
