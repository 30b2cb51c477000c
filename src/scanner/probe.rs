//! Cheap structural validation of image containers.
//!
//! Probing reads only the container header: the format is guessed from the
//! leading bytes and the decoder is asked for its dimensions. No pixel data
//! is decoded.

use std::io;
use std::path::Path;

use image::{ImageFormat, ImageReader};
use thiserror::Error;

use super::Dimensions;

/// What a successful probe learned about an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeInfo {
    /// Container format recognised from the file header
    pub format: ImageFormat,
    /// Pixel dimensions reported by the decoder
    pub dimensions: Dimensions,
}

/// Reasons a probe can fail.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The file could not be opened or read.
    #[error("cannot read file: {0}")]
    Io(#[from] io::Error),

    /// The header does not match any known image container.
    #[error("unrecognized image container")]
    UnknownFormat,

    /// The decoder rejected the header.
    #[error("{0}")]
    Image(#[from] image::ImageError),
}

/// Probe the image container at `path`.
///
/// # Errors
///
/// Returns [`ProbeError`] if the file cannot be read, is not a recognised
/// image container, or its header is corrupt.
pub fn probe(path: &Path) -> Result<ProbeInfo, ProbeError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format().ok_or(ProbeError::UnknownFormat)?;
    let (width, height) = reader.into_dimensions()?;

    if width == 0 || height == 0 {
        return Err(ProbeError::Image(image::ImageError::Limits(
            image::error::LimitError::from_kind(image::error::LimitErrorKind::DimensionError),
        )));
    }

    Ok(ProbeInfo {
        format,
        dimensions: Dimensions::new(width, height),
    })
}
