//! Scanner module for image discovery and fingerprinting.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk, filtered by an extension allowlist
//! - Cheap structural validation of image containers (header only)
//! - Content digests with BLAKE3 (streaming)
//! - Per-file metadata and perceptual codes computed in a bounded worker pool
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and image discovery
//! - [`probe`]: Container probing shared by the walker and fingerprinter
//! - [`hasher`]: BLAKE3 file hashing (streaming, constant memory)
//! - [`fingerprint`]: Parallel digest + metadata computation
//! - [`identity`]: Symlink and hardlink aliases of one physical file
//! - [`perceptual`]: Average-hash codes used as a pixel-comparison pre-filter
//!
//! # Example
//!
//! ```no_run
//! use imgdedupe::scanner::{ScanConfig, Walker};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), ScanConfig::default());
//! let outcome = walker.scan().unwrap();
//! for image in &outcome.files {
//!     println!("{}: {} ({} bytes)", image.path.display(), image.dimensions, image.size);
//! }
//! ```

pub mod fingerprint;
pub mod hasher;
pub mod identity;
pub mod perceptual;
pub mod probe;
pub mod walker;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

// Re-export main types
pub use fingerprint::{Fingerprint, FingerprintSet, Fingerprinter, ImageMetadata, MetadataKey};
pub use hasher::{ContentDigest, Hasher, CHUNK_SIZE};
pub use identity::{collapse_aliases, frees_space, same_file, FileIdentity};
pub use perceptual::{PerceptualCode, PerceptualHasher};
pub use probe::{probe, ProbeError, ProbeInfo};
pub use walker::Walker;

/// File extensions accepted by the scanner (compared case-insensitively).
///
/// This is a fixed allowlist; file contents are never sniffed to widen it.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp", "jfif"];

/// Check whether a path carries one of the [`SUPPORTED_EXTENSIONS`].
#[must_use]
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// An image discovered during the scan.
///
/// Identity is the absolute path. The remaining fields are a snapshot
/// taken when the file was scanned and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Pixel dimensions read from the container header
    pub dimensions: Dimensions,
    /// Last modification time, if the platform reports one
    pub modified: Option<SystemTime>,
    /// Creation (birth) time, if the platform reports one
    pub created: Option<SystemTime>,
    /// Container format detected while validating the file
    pub format: ImageFormat,
    /// Whether the path is a symlink (only when links are followed)
    pub is_symlink: bool,
}

impl ImageFile {
    /// Create a new ImageFile without timestamps.
    ///
    /// # Arguments
    ///
    /// * `path` - Absolute path to the image
    /// * `size` - File size in bytes
    /// * `dimensions` - Pixel dimensions
    /// * `format` - Detected container format
    #[must_use]
    pub fn new(path: PathBuf, size: u64, dimensions: Dimensions, format: ImageFormat) -> Self {
        Self {
            path,
            size,
            dimensions,
            modified: None,
            created: None,
            format,
            is_symlink: false,
        }
    }

    /// Attach modification and creation timestamps.
    #[must_use]
    pub fn with_times(mut self, modified: Option<SystemTime>, created: Option<SystemTime>) -> Self {
        self.modified = modified;
        self.created = created;
        self
    }

    /// Mark the path as a symlink.
    #[must_use]
    pub fn with_symlink(mut self, is_symlink: bool) -> Self {
        self.is_symlink = is_symlink;
        self
    }

    /// Short name of the container format (e.g. `"png"`).
    #[must_use]
    pub fn format_name(&self) -> &'static str {
        format_name(self.format)
    }
}

/// Short, stable name for an image container format.
#[must_use]
pub fn format_name(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("unknown")
}

/// Configuration for directory scanning.
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Directories that are never descended into (e.g. a backup root
    /// located inside the scanned tree).
    pub exclude_dirs: Vec<PathBuf>,
}

impl ScanConfig {
    /// Exclude an additional directory from traversal.
    #[must_use]
    pub fn with_excluded_dir(mut self, dir: PathBuf) -> Self {
        self.exclude_dirs.push(dir);
        self
    }
}

/// Result of a completed scan.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Valid images, in traversal order
    pub files: Vec<ImageFile>,
    /// Entries that were skipped (failed validation or could not be read)
    pub warnings: Vec<ScanError>,
    /// Symlinks and hardlinks dropped because their file was already found
    pub aliases_skipped: usize,
    /// Whether the walk stopped early because shutdown was requested
    pub interrupted: bool,
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified root was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file or directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file has a supported extension but its container is not a valid image.
    #[error("Invalid image {path}: {reason}")]
    InvalidImage {
        /// Path of the rejected file
        path: PathBuf,
        /// Why validation failed
        reason: String,
    },
}

impl ScanError {
    /// Path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::NotADirectory(p) => p,
            Self::Io { path, .. } | Self::InvalidImage { path, .. } => path,
        }
    }
}

/// Errors raised while fingerprinting a single file.
///
/// These never abort the run; the affected file is simply left out of the
/// tier that needed the failed value.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// The file could not be opened or read.
    #[error("Unreadable file {path}: {source}")]
    Unreadable {
        /// Path of the unreadable file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The image container or its pixels could not be decoded.
    #[error("Failed to decode image {path}: {reason}")]
    DecodeFailed {
        /// Path of the undecodable file
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Work on this file was skipped because shutdown was requested.
    #[error("Fingerprinting interrupted")]
    Interrupted,
}
