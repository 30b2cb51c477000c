//! Two-tier duplicate grouping.
//!
//! # Overview
//!
//! Grouping is single-threaded and works over the in-memory
//! [`FingerprintSet`]. Both tiers read and update an explicit
//! [`GroupingState`]; no file is ever placed in two groups.
//!
//! ## Exact-digest tier
//!
//! Files are grouped by [`ContentDigest`]. Every group of 2+ files is
//! accepted and its members are claimed.
//!
//! ## Metadata tier
//!
//! Unclaimed files are bucketed by [`MetadataKey`]. Each bucket of 2+ files
//! is partitioned by [`partition_identical`]: a file joins a sub-group only
//! if it was verified identical to that sub-group's representative.
//!
//! # Example
//!
//! ```no_run
//! use imgdedupe::duplicates::{exact_digest_tier, metadata_buckets, metadata_tier, Comparator, GroupingState};
//! use imgdedupe::scanner::{Fingerprinter, ScanConfig, Walker};
//! use std::path::Path;
//!
//! let outcome = Walker::new(Path::new("."), ScanConfig::default()).scan().unwrap();
//! let set = Fingerprinter::new(4).unwrap().fingerprint_all(outcome.files);
//!
//! let mut state = GroupingState::new();
//! let mut groups = exact_digest_tier(&set, &mut state);
//! let buckets = metadata_buckets(&set, &state);
//! groups.extend(metadata_tier(&set, &buckets, &Comparator::new(), &mut state));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::compare::Comparator;
use super::{DuplicateGroup, GroupKind};
use crate::scanner::{ContentDigest, Fingerprint, FingerprintSet, MetadataKey};

/// Files already assigned to a group.
#[derive(Debug, Clone, Default)]
pub struct GroupingState {
    claimed: HashSet<PathBuf>,
}

impl GroupingState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` already belongs to a group.
    #[must_use]
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains(path)
    }

    /// Number of claimed files.
    #[must_use]
    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    /// Claim every member of an accepted group.
    fn claim(&mut self, group: &DuplicateGroup) {
        for file in &group.files {
            let fresh = self.claimed.insert(file.path.clone());
            debug_assert!(fresh, "{} claimed twice", file.path.display());
        }
    }
}

/// Accept all groups of 2+ unclaimed files sharing a content digest.
///
/// Returned groups are sorted by their smallest path.
pub fn exact_digest_tier(set: &FingerprintSet, state: &mut GroupingState) -> Vec<DuplicateGroup> {
    let mut by_digest: HashMap<ContentDigest, Vec<&Fingerprint>> = HashMap::new();
    for fingerprint in set.iter() {
        if state.is_claimed(fingerprint.path()) {
            continue;
        }
        if let Some(digest) = fingerprint.digest() {
            by_digest.entry(digest).or_default().push(fingerprint);
        }
    }

    let mut groups: Vec<DuplicateGroup> = by_digest
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(digest, members)| {
            log::debug!(
                "Exact digest group {}: {} files",
                digest,
                members.len()
            );
            DuplicateGroup::new(
                GroupKind::ExactDigest,
                members.into_iter().map(|f| f.file.clone()).collect(),
            )
        })
        .collect();
    sort_groups(&mut groups);

    for group in &groups {
        state.claim(group);
    }

    log::info!("Exact digest tier: {} group(s)", groups.len());
    groups
}

/// Bucket unclaimed files by `(dimensions, size)`, keeping buckets of 2+.
///
/// Paths inside each bucket are in ascending order.
#[must_use]
pub fn metadata_buckets(
    set: &FingerprintSet,
    state: &GroupingState,
) -> BTreeMap<MetadataKey, Vec<PathBuf>> {
    let mut buckets: BTreeMap<MetadataKey, Vec<PathBuf>> = BTreeMap::new();
    for fingerprint in set.iter() {
        if state.is_claimed(fingerprint.path()) {
            continue;
        }
        if let Some(key) = fingerprint.metadata_key() {
            buckets
                .entry(key)
                .or_default()
                .push(fingerprint.file.path.clone());
        }
    }
    buckets.retain(|_, paths| paths.len() > 1);

    log::info!(
        "Metadata tier: {} candidate bucket(s), {} file(s)",
        buckets.len(),
        buckets.values().map(Vec::len).sum::<usize>()
    );
    buckets
}

/// Verify each bucket pairwise and accept sub-groups of 2+ identical files.
///
/// Returned groups are sorted by their smallest path.
pub fn metadata_tier(
    set: &FingerprintSet,
    buckets: &BTreeMap<MetadataKey, Vec<PathBuf>>,
    comparator: &Comparator,
    state: &mut GroupingState,
) -> Vec<DuplicateGroup> {
    let mut groups = Vec::new();

    for (key, paths) in buckets {
        let members: Vec<&Fingerprint> = paths
            .iter()
            .filter(|p| !state.is_claimed(p))
            .filter_map(|p| set.get(p))
            .collect();
        if members.len() < 2 {
            continue;
        }

        log::debug!(
            "Verifying {} candidate(s) at {} / {} bytes",
            members.len(),
            key.dimensions,
            key.size
        );

        for indices in partition_identical(&members, |a, b| comparator.are_identical(a, b)) {
            let group = DuplicateGroup::new(
                GroupKind::ExactPixelContent,
                indices.iter().map(|&i| members[i].file.clone()).collect(),
            );
            state.claim(&group);
            groups.push(group);
        }
    }
    sort_groups(&mut groups);

    log::info!("Pixel content tier: {} group(s)", groups.len());
    groups
}

/// Partition `items` into maximal sub-groups by representative matching.
///
/// Each unassigned item in order becomes a representative; every later
/// unassigned item that `same(representative, item)` accepts joins it.
/// Only sub-groups with 2+ members are returned, as index lists.
pub fn partition_identical<T>(
    items: &[T],
    mut same: impl FnMut(&T, &T) -> bool,
) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; items.len()];
    let mut partitions = Vec::new();

    for i in 0..items.len() {
        if assigned[i] {
            continue;
        }
        let mut group = vec![i];
        for j in (i + 1)..items.len() {
            if !assigned[j] && same(&items[i], &items[j]) {
                assigned[j] = true;
                group.push(j);
            }
        }
        if group.len() > 1 {
            assigned[i] = true;
            partitions.push(group);
        }
    }

    partitions
}

/// Total duplicate count: sum of (group size - 1).
#[must_use]
pub fn total_duplicates(groups: &[DuplicateGroup]) -> usize {
    groups.iter().map(DuplicateGroup::duplicate_count).sum()
}

fn sort_groups(groups: &mut [DuplicateGroup]) {
    groups.sort_by(|a, b| a.first_path().cmp(&b.first_path()));
}
