//! Perceptual image codes.
//!
//! An average hash (aHash) is a deterministic function of the decoded
//! pixels. Images whose pixels are identical after color normalization
//! always produce the same code, so differing codes prove two images are
//! not pixel-identical without decoding them side by side.

use std::path::Path;

use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

use super::FingerprintError;

/// Fixed-length perceptual code of a decoded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PerceptualCode(Box<[u8]>);

impl PerceptualCode {
    /// Raw code bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of differing bits between two codes.
    #[must_use]
    pub fn distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

impl From<&[u8]> for PerceptualCode {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

/// Computes average-hash codes for images.
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    /// Create an 8x8 mean (aHash) hasher.
    #[must_use]
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(8, 8)
            .hash_alg(HashAlg::Mean)
            .to_hasher();
        Self { hasher }
    }

    /// Code for an already decoded image.
    #[must_use]
    pub fn code(&self, image: &DynamicImage) -> PerceptualCode {
        PerceptualCode::from(self.hasher.hash_image(image).as_bytes())
    }

    /// Decode the image at `path` and compute its code.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::DecodeFailed`] if the image cannot be
    /// decoded.
    pub fn code_for_path(&self, path: &Path) -> Result<PerceptualCode, FingerprintError> {
        let image = image::open(path).map_err(|e| FingerprintError::DecodeFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(self.code(&image))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PerceptualHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptualHasher")
            .field("algorithm", &"aHash")
            .finish()
    }
}
