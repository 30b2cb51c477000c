//! Physical file identity for symlinks and hardlinks.
//!
//! # Overview
//!
//! Several directory entries can name the same bytes on disk: a followed
//! symlink and its target, or two hardlinks to one inode. They share a
//! content digest but are not duplicates, and deleting one of them either
//! frees nothing or, worse, removes the data a surviving link points at.
//!
//! [`FileIdentity`] names the underlying file so those aliases can be
//! collapsed before grouping and refused during cleanup.
//!
//! # Platform Support
//!
//! - **Unix**: (device, inode) of the resolved file, so both symlinks and
//!   hardlinks are recognised
//! - **Other**: canonical path, so symlinks are recognised but hardlinks
//!   look like distinct files

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use super::ImageFile;

/// The file a path ultimately refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    /// Device and inode numbers
    Inode { dev: u64, ino: u64 },
    /// Fully resolved path
    Canonical(PathBuf),
}

impl FileIdentity {
    /// Identity of the file at `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the path cannot be resolved.
    pub fn of(path: &Path) -> io::Result<Self> {
        #[cfg(unix)]
        {
            let metadata = fs::metadata(path)?;
            Ok(Self::from_metadata(&metadata))
        }
        #[cfg(not(unix))]
        {
            path.canonicalize().map(Self::Canonical)
        }
    }

    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::Inode {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }
}

/// Whether two paths refer to the same file on disk.
///
/// Unresolvable paths are never considered the same.
#[must_use]
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (FileIdentity::of(a), FileIdentity::of(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Whether removing the entry at `path` releases its data.
///
/// A symlink only drops the link, and a hardlink with other names left
/// keeps the inode alive.
#[must_use]
pub fn frees_space(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(metadata) => !metadata.file_type().is_symlink() && is_last_link(&metadata),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn is_last_link(metadata: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink() <= 1
}

#[cfg(not(unix))]
fn is_last_link(_metadata: &Metadata) -> bool {
    true
}

/// Keep one entry per physical file.
///
/// Real files win over symlinks, then the smallest path wins. Files whose
/// identity cannot be read are kept as they are. Returns the surviving
/// files and the number of aliases dropped.
#[must_use]
pub fn collapse_aliases(mut files: Vec<ImageFile>) -> (Vec<ImageFile>, usize) {
    files.sort_by(|a, b| (a.is_symlink, &a.path).cmp(&(b.is_symlink, &b.path)));

    let mut seen: HashMap<FileIdentity, PathBuf> = HashMap::with_capacity(files.len());
    let mut kept = Vec::with_capacity(files.len());
    let mut dropped = 0;

    for file in files {
        match FileIdentity::of(&file.path) {
            Ok(identity) => {
                if let Some(first) = seen.get(&identity) {
                    log::debug!(
                        "Skipping {} (same file as {})",
                        file.path.display(),
                        first.display()
                    );
                    dropped += 1;
                    continue;
                }
                seen.insert(identity, file.path.clone());
            }
            Err(e) => log::debug!("No identity for {}: {}", file.path.display(), e),
        }
        kept.push(file);
    }

    (kept, dropped)
}
