//! Identity verification for metadata-tier candidates.
//!
//! [`Comparator::are_identical`] answers "do these two files hold the same
//! picture?" and is fail-safe: any error while deciding means "not
//! identical", so an uncertain pair is never grouped and never deleted.
//!
//! Checks run cheapest first:
//! 1. byte size and pixel dimensions
//! 2. content digests (equal digests short-circuit to identical)
//! 3. optional perceptual pre-filter (differing codes mean different pixels)
//! 4. full decode and exact comparison of the pixel buffers; images with
//!    different color types are both widened to RGBA f32 first, which keeps
//!    every channel value (alpha included)

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::scanner::{ContentDigest, Dimensions, Fingerprint, Hasher};

/// Errors raised while verifying a pair.
///
/// These are logged and turned into a "not identical" verdict.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    /// The pair could not be compared with certainty.
    #[error("Cannot compare {a} and {b}: {reason}")]
    ComparisonAmbiguous {
        /// First file of the pair
        a: PathBuf,
        /// Second file of the pair
        b: PathBuf,
        /// What went wrong
        reason: String,
    },
}

/// Pairwise identity checker.
#[derive(Debug, Clone)]
pub struct Comparator {
    hasher: Hasher,
    perceptual_prefilter: bool,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparator {
    /// Create a comparator with the perceptual pre-filter enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: Hasher::new(),
            perceptual_prefilter: true,
        }
    }

    /// Hasher used when a cached digest is missing.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Hasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Enable or disable the perceptual pre-filter.
    #[must_use]
    pub fn with_perceptual_prefilter(mut self, enabled: bool) -> Self {
        self.perceptual_prefilter = enabled;
        self
    }

    /// Decide whether two fingerprinted files hold identical pixels.
    ///
    /// Never errors: failures are logged and yield `false`.
    #[must_use]
    pub fn are_identical(&self, a: &Fingerprint, b: &Fingerprint) -> bool {
        let (size_a, dims_a) = size_and_dimensions(a);
        let (size_b, dims_b) = size_and_dimensions(b);
        if size_a != size_b || dims_a != dims_b {
            return false;
        }

        if let (Some(da), Some(db)) = (self.digest_of(a), self.digest_of(b)) {
            if da == db {
                return true;
            }
        }

        if self.perceptual_prefilter {
            if let (Some(ca), Some(cb)) = (a.perceptual_code(), b.perceptual_code()) {
                if ca != cb {
                    log::trace!(
                        "Perceptual codes differ: {} vs {}",
                        a.path().display(),
                        b.path().display()
                    );
                    return false;
                }
            }
        }

        match compare_pixels(a.path(), b.path()) {
            Ok(same) => same,
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    fn digest_of(&self, fingerprint: &Fingerprint) -> Option<ContentDigest> {
        fingerprint
            .digest()
            .or_else(|| self.hasher.digest(fingerprint.path()).ok())
    }
}

fn size_and_dimensions(fingerprint: &Fingerprint) -> (u64, Dimensions) {
    match fingerprint.metadata {
        Ok(ref meta) => (meta.size, meta.dimensions),
        Err(_) => (fingerprint.file.size, fingerprint.file.dimensions),
    }
}

/// Decode both files and compare their pixel buffers exactly.
///
/// The result does not depend on argument order.
///
/// # Errors
///
/// Returns [`CompareError::ComparisonAmbiguous`] if either file cannot be
/// decoded.
pub fn compare_pixels(a: &Path, b: &Path) -> Result<bool, CompareError> {
    let ambiguous = |reason: String| CompareError::ComparisonAmbiguous {
        a: a.to_path_buf(),
        b: b.to_path_buf(),
        reason,
    };

    let image_a = image::open(a).map_err(|e| ambiguous(format!("{}: {e}", a.display())))?;
    let image_b = image::open(b).map_err(|e| ambiguous(format!("{}: {e}", b.display())))?;

    Ok(same_pixels(&image_a, &image_b))
}

fn same_pixels(a: &DynamicImage, b: &DynamicImage) -> bool {
    if a.width() != b.width() || a.height() != b.height() {
        return false;
    }
    if a.color() == b.color() {
        return a.as_bytes() == b.as_bytes();
    }
    // NaN never equals itself, so float buffers holding one stay distinct
    a.to_rgba32f().as_raw() == b.to_rgba32f().as_raw()
}
