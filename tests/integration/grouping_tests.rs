use super::fixtures::{copy_image, pixel_twin, write_corrupt, write_image};
use imgdedupe::duplicates::{
    select_keeper, total_duplicates, DuplicateFinder, FinderConfig, GroupKind,
};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_copy_grouped_and_different_pixels_left_alone() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.bmp", 80, 60, 1);
    copy_image(&a, dir.path(), "b.bmp");
    // Same dimensions and byte size as A, different pixels
    let c = write_image(dir.path(), "c.bmp", 80, 60, 2);
    assert_eq!(
        fs::metadata(&a).unwrap().len(),
        fs::metadata(&c).unwrap().len()
    );

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = dir.path().canonicalize().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, GroupKind::ExactDigest);
    assert_eq!(
        groups[0].paths(),
        vec![root.join("a.bmp"), root.join("b.bmp")]
    );
    assert!(!groups[0].contains(&root.join("c.bmp")));
    assert_eq!(total_duplicates(&groups), 1);
    assert_eq!(summary.duplicate_files, 1);

    // A was written first; sizes are equal so the older file is kept
    let keeper = select_keeper(&groups[0]).unwrap();
    assert_eq!(keeper.path, root.join("a.bmp"));
}

#[test]
fn test_same_size_different_pixels_without_prefilter() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "x.bmp", 32, 32, 10);
    write_image(dir.path(), "y.bmp", 32, 32, 11);

    let config = FinderConfig::default().with_perceptual_prefilter(false);
    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.pixel_candidates, 2);
}

#[test]
fn test_exact_duplicates_ignore_names_and_timestamps() {
    let dir = tempdir().unwrap();
    let original = write_image(dir.path(), "IMG_0001.png", 40, 30, 5);
    let copy = copy_image(&original, dir.path(), "holiday/renamed copy.png");
    filetime::set_file_mtime(&copy, filetime::FileTime::from_unix_time(946_684_800, 0))
        .unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, GroupKind::ExactDigest);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_claimed_files_are_not_regrouped() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.bmp", 24, 24, 3);
    // b and c are byte-identical to each other and pixel twins of a
    pixel_twin(&a, dir.path(), "b.bmp");
    pixel_twin(&a, dir.path(), "c.bmp");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let root = dir.path().canonicalize().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, GroupKind::ExactDigest);
    assert_eq!(
        groups[0].paths(),
        vec![root.join("b.bmp"), root.join("c.bmp")]
    );
    assert_eq!(summary.pixel_content_groups, 0);
    assert_eq!(summary.pixel_candidates, 0);
}

#[test]
fn test_pixel_twins_grouped() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.bmp", 24, 24, 3);
    pixel_twin(&a, dir.path(), "b.bmp");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, GroupKind::ExactPixelContent);
    assert_eq!(summary.pixel_content_groups, 1);
}

#[test]
fn test_files_appear_in_at_most_one_group() {
    let dir = tempdir().unwrap();
    for seed in 0..4 {
        let src = write_image(dir.path(), &format!("s{seed}.bmp"), 16, 16, seed);
        copy_image(&src, dir.path(), &format!("s{seed}_copy.bmp"));
        pixel_twin(&src, dir.path(), &format!("s{seed}_twin.bmp"));
    }
    write_image(dir.path(), "unique.png", 16, 16, 99);

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    let mut seen: HashSet<PathBuf> = HashSet::new();
    for group in &groups {
        assert!(group.len() >= 2);
        for path in group.paths() {
            assert!(seen.insert(path.clone()), "{} grouped twice", path.display());
        }
    }
    assert_eq!(groups.len(), 4);
}

#[test]
fn test_groups_sorted_deterministically() {
    let dir = tempdir().unwrap();
    let z = write_image(dir.path(), "z.png", 8, 8, 1);
    copy_image(&z, dir.path(), "y.png");
    let m = write_image(dir.path(), "m.png", 8, 8, 2);
    copy_image(&m, dir.path(), "n.png");

    let finder = DuplicateFinder::with_defaults();
    let (first, _) = finder.find_duplicates(dir.path()).unwrap();
    let (second, _) = finder.find_duplicates(dir.path()).unwrap();

    let paths = |groups: &[imgdedupe::duplicates::DuplicateGroup]| {
        groups.iter().map(|g| g.paths()).collect::<Vec<_>>()
    };
    assert_eq!(paths(&first), paths(&second));
    assert!(first[0].first_path() < first[1].first_path());
    assert_eq!(first[0].first_path().unwrap().file_name().unwrap(), "m.png");
}

#[test]
fn test_corrupt_file_does_not_block_others() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 20, 20, 8);
    copy_image(&a, dir.path(), "b.png");
    write_image(dir.path(), "c.png", 20, 20, 9);
    write_corrupt(dir.path(), "broken.png");

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.skipped_files(), 1);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_keeper_prefers_larger_file() {
    let dir = tempdir().unwrap();
    let small = write_image(dir.path(), "a.bmp", 12, 12, 4);
    let twin = pixel_twin(&small, dir.path(), "b.bmp");

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(groups.len(), 1);

    // Grow b after the scan; the keeper rule reads fresh sizes
    let mut bytes = fs::read(&twin).unwrap();
    bytes.extend_from_slice(&[0u8; 64]);
    fs::write(&twin, bytes).unwrap();

    let keeper = select_keeper(&groups[0]).unwrap();
    assert_eq!(keeper.path.file_name().unwrap(), "b.bmp");
}
