//! Synthetic image trees.

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Deterministic noise so distinct seeds never share pixels.
pub fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503) ^ seed)
            .wrapping_mul(2_246_822_519);
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    })
}

/// Save a noise image; the format follows the extension.
pub fn write_image(dir: &Path, name: &str, width: u32, height: u32, seed: u32) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    noise(width, height, seed).save(&path).unwrap();
    path
}

/// Byte-identical copy.
pub fn copy_image(src: &Path, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::copy(src, &path).unwrap();
    path
}

/// Copy of a BMP with a reserved header byte changed: same size, same
/// pixels, different digest.
pub fn pixel_twin(src: &Path, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut bytes = fs::read(src).unwrap();
    bytes[6] ^= 0xFF;
    fs::write(&path, bytes).unwrap();
    path
}

/// A file with an image extension but garbage content.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"definitely not an image").unwrap();
    path
}
