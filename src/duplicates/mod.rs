//! Duplicate detection module.
//!
//! Detection runs in two tiers over the fingerprints computed by the
//! scanner:
//! 1. **Exact digest**: files with equal content digests are grouped.
//! 2. **Pixel content**: remaining files are bucketed by
//!    `(dimensions, size)` and each bucket is partitioned by pairwise
//!    verification against a representative.
//!
//! A file belongs to at most one group. The [`GroupingState`] tracks
//! claimed files and is threaded explicitly through the tiers.

pub mod compare;
pub mod finder;
pub mod groups;
pub mod keeper;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scanner::ImageFile;

pub use compare::{compare_pixels, CompareError, Comparator};
pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{
    exact_digest_tier, metadata_buckets, metadata_tier, partition_identical, total_duplicates,
    GroupingState,
};
pub use keeper::{retention_key, select_keeper, select_keeper_by, RetentionKey};

/// Which detection tier established a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// All members have the same content digest.
    ExactDigest,
    /// Members differ at the byte level but decode to identical pixels.
    ExactPixelContent,
}

impl GroupKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactDigest => "exact_digest",
            Self::ExactPixelContent => "exact_pixel_content",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmed group of images believed identical by one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Tier that established the group
    pub kind: GroupKind,
    /// Members, sorted by path
    pub files: Vec<ImageFile>,
}

impl DuplicateGroup {
    /// Create a group; members are sorted by path.
    #[must_use]
    pub fn new(kind: GroupKind, mut files: Vec<ImageFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { kind, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of duplicate copies (total - 1 keeper).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Total size of all files in this group (scan snapshot).
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Smallest member path, used to order groups.
    #[must_use]
    pub fn first_path(&self) -> Option<&Path> {
        self.files.first().map(|f| f.path.as_path())
    }

    /// Paths of the members.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}
