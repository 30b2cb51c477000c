use super::fixtures::{copy_image, write_corrupt, write_image};
use imgdedupe::scanner::{ScanConfig, ScanError, Walker};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn scanned_names(outcome: &imgdedupe::scanner::ScanOutcome) -> Vec<String> {
    let mut names: Vec<String> = outcome
        .files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let outcome = Walker::new(dir.path(), ScanConfig::default())
        .scan()
        .unwrap();
    assert!(outcome.files.is_empty());
    assert!(outcome.warnings.is_empty());
    assert!(!outcome.interrupted);
}

#[test]
fn test_scan_extension_allowlist() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "a.png", 4, 4, 1);
    write_image(dir.path(), "b.bmp", 4, 4, 2);
    let png = write_image(dir.path(), "c.png", 4, 4, 3);
    // Valid image content behind a non-image extension is never picked up
    fs::copy(&png, dir.path().join("c.dat")).unwrap();
    fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    let outcome = Walker::new(dir.path(), ScanConfig::default())
        .scan()
        .unwrap();
    assert_eq!(scanned_names(&outcome), vec!["a.png", "b.bmp", "c.png"]);
}

#[test]
fn test_scan_extension_case_insensitive() {
    let dir = tempdir().unwrap();
    let png = write_image(dir.path(), "lower.png", 4, 4, 1);
    copy_image(&png, dir.path(), "UPPER.PNG");

    let outcome = Walker::new(dir.path(), ScanConfig::default())
        .scan()
        .unwrap();
    assert_eq!(scanned_names(&outcome), vec!["UPPER.PNG", "lower.png"]);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "top.png", 4, 4, 1);
    write_image(dir.path(), "2023/summer/beach.png", 4, 4, 2);
    write_image(dir.path(), "2024/winter.bmp", 4, 4, 3);

    let outcome = Walker::new(dir.path(), ScanConfig::default())
        .scan()
        .unwrap();
    assert_eq!(outcome.files.len(), 3);
    for file in &outcome.files {
        assert!(file.path.is_absolute());
        assert_eq!(file.dimensions.width, 4);
        assert!(file.size > 0);
    }
}

#[test]
fn test_scan_skips_corrupt_and_empty_files() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "good.png", 4, 4, 1);
    write_corrupt(dir.path(), "bad.jpg");
    fs::write(dir.path().join("empty.png"), b"").unwrap();

    let outcome = Walker::new(dir.path(), ScanConfig::default())
        .scan()
        .unwrap();
    assert_eq!(scanned_names(&outcome), vec!["good.png"]);
    assert_eq!(outcome.warnings.len(), 2);

    let mut skipped: Vec<PathBuf> = outcome
        .warnings
        .iter()
        .map(|w| w.path().to_path_buf())
        .collect();
    skipped.sort();
    assert_eq!(
        skipped,
        vec![dir.path().join("bad.jpg"), dir.path().join("empty.png")]
    );
}

#[test]
fn test_scan_skip_hidden() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "visible.png", 4, 4, 1);
    write_image(dir.path(), ".hidden.png", 4, 4, 2);
    write_image(dir.path(), ".cache/thumb.png", 4, 4, 3);

    let all = Walker::new(dir.path(), ScanConfig::default())
        .scan()
        .unwrap();
    assert_eq!(all.files.len(), 3);

    let config = ScanConfig {
        skip_hidden: true,
        ..ScanConfig::default()
    };
    let visible = Walker::new(dir.path(), config).scan().unwrap();
    assert_eq!(scanned_names(&visible), vec!["visible.png"]);
}

#[test]
fn test_scan_excluded_directory() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "photo.png", 4, 4, 1);
    write_image(dir.path(), "backup/photo.png", 4, 4, 1);

    let config = ScanConfig::default().with_excluded_dir(dir.path().join("backup"));
    let outcome = Walker::new(dir.path(), config).scan().unwrap();
    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.files[0].path, dir.path().join("photo.png"));
}

#[test]
fn test_scan_invalid_root() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");
    let result = Walker::new(&missing, ScanConfig::default()).scan();
    assert!(matches!(result, Err(ScanError::NotFound(_))));

    let file = write_image(dir.path(), "file.png", 2, 2, 0);
    let result = Walker::new(&file, ScanConfig::default()).scan();
    assert!(matches!(result, Err(ScanError::NotADirectory(_))));
}

#[cfg(unix)]
#[test]
fn test_scan_unreadable_directory_continues() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write_image(dir.path(), "ok.png", 4, 4, 1);
    write_image(dir.path(), "locked/inside.png", 4, 4, 2);

    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let outcome = Walker::new(dir.path(), ScanConfig::default())
        .scan()
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    // Root may bypass permissions; the readable image is always found
    assert!(outcome
        .files
        .iter()
        .any(|f| f.path == dir.path().join("ok.png")));
}
