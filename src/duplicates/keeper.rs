//! Retention policy: which member of a group survives cleanup.
//!
//! The keeper is the file with the largest byte size; ties go to the
//! earliest creation time, then to the smallest path. Stat information is
//! read fresh from disk. Where the platform has no birth time the
//! modification time stands in. A file that cannot be stat'ed is ranked as
//! size 0 with no creation time, so it sorts after every readable file.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use super::DuplicateGroup;
use crate::scanner::ImageFile;

/// Fresh stat values used to rank group members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionKey {
    /// Byte size; 0 if the file could not be stat'ed
    pub size: u64,
    /// Creation time (or mtime fallback); `None` ranks last
    pub created: Option<SystemTime>,
}

impl RetentionKey {
    /// Key assigned to a file whose stat failed.
    pub const UNAVAILABLE: Self = Self {
        size: 0,
        created: None,
    };
}

/// Stat `path` and build its retention key.
#[must_use]
pub fn retention_key(path: &Path) -> RetentionKey {
    match fs::metadata(path) {
        Ok(meta) => RetentionKey {
            size: meta.len(),
            created: meta.created().or_else(|_| meta.modified()).ok(),
        },
        Err(e) => {
            log::warn!("Cannot stat {} for retention: {}", path.display(), e);
            RetentionKey::UNAVAILABLE
        }
    }
}

/// Pick the file to keep from a group, using fresh stat information.
///
/// Returns `None` only for an empty group.
#[must_use]
pub fn select_keeper(group: &DuplicateGroup) -> Option<&ImageFile> {
    select_keeper_by(&group.files, |file| retention_key(&file.path))
}

/// Pick the file to keep using `key` to rank members.
///
/// Deterministic for a given set of keys: the result does not depend on
/// the order of `files`.
pub fn select_keeper_by<F>(files: &[ImageFile], key: F) -> Option<&ImageFile>
where
    F: Fn(&ImageFile) -> RetentionKey,
{
    files
        .iter()
        .map(|file| (file, key(file)))
        .min_by(|(fa, ka), (fb, kb)| rank(ka, kb).then_with(|| fa.path.cmp(&fb.path)))
        .map(|(file, _)| file)
}

/// Ordering where `Less` means "preferred as keeper".
fn rank(a: &RetentionKey, b: &RetentionKey) -> Ordering {
    b.size.cmp(&a.size).then_with(|| match (a.created, b.created) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}
