use super::fixtures::{copy_image, pixel_twin, write_image};
use clap::Parser;
use imgdedupe::actions::{CleanupExecutor, CleanupMode, FileStatus};
use imgdedupe::cli::Cli;
use imgdedupe::duplicates::DuplicateFinder;
use imgdedupe::error::ExitCode;
use imgdedupe::output::CleanupReport;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .map(|p| {
            (
                p.file_name().unwrap().to_string_lossy().into_owned(),
                fs::read(&p).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["imgdedupe", "-q"];
    argv.extend_from_slice(args);
    imgdedupe::run_app(Cli::try_parse_from(argv).unwrap()).unwrap()
}

fn read_report(path: &Path) -> CleanupReport {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_dry_run_leaves_files_untouched() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 30, 30, 1);
    copy_image(&a, dir.path(), "b.png");
    copy_image(&a, dir.path(), "c.png");
    let x = write_image(dir.path(), "x.bmp", 16, 16, 2);
    pixel_twin(&x, dir.path(), "y.bmp");
    let before = snapshot(dir.path());

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let result = CleanupExecutor::new(&summary.root, CleanupMode::DryRun).execute(&groups);

    assert_eq!(snapshot(dir.path()), before);
    assert!(!result.interrupted);
    assert_eq!(result.removed_count(), 3);
    assert_eq!(result.kept_count(), 2);

    let expected: u64 = result
        .plan
        .groups
        .iter()
        .flat_map(|g| g.removals.iter())
        .map(|f| f.size)
        .sum();
    assert_eq!(result.bytes_reclaimed, expected);
    assert_eq!(
        expected,
        2 * fs::metadata(&a).unwrap().len() + fs::metadata(&x).unwrap().len()
    );
    assert!(result
        .outcomes
        .iter()
        .all(|o| matches!(o.status, FileStatus::Kept | FileStatus::WouldRemove)));
}

#[test]
fn test_apply_with_backup_mirrors_tree() {
    let root = tempdir().unwrap();
    let backup = tempdir().unwrap();
    let a = write_image(root.path(), "albums/a.png", 30, 30, 1);
    let b = copy_image(&a, root.path(), "albums/trip/b.png");
    let original = fs::read(&b).unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(root.path())
        .unwrap();
    let result = CleanupExecutor::new(&summary.root, CleanupMode::Apply)
        .with_backup_root(backup.path())
        .execute(&groups);

    assert_eq!(result.removed_count(), 1);
    assert_eq!(result.failed_count(), 0);
    assert!(a.exists());
    assert!(!b.exists());

    let mirrored = backup.path().join("albums/trip/b.png");
    assert_eq!(fs::read(&mirrored).unwrap(), original);
    let removed = result
        .outcomes
        .iter()
        .find(|o| o.status == FileStatus::Removed)
        .unwrap();
    assert_eq!(removed.backup_path.as_deref(), Some(mirrored.as_path()));
    assert_eq!(result.bytes_reclaimed, original.len() as u64);
}

#[test]
fn test_end_to_end_apply_via_cli() {
    let dir = tempdir().unwrap();
    let reports = tempdir().unwrap();
    let a = write_image(dir.path(), "a.bmp", 40, 30, 1);
    copy_image(&a, dir.path(), "b.bmp");
    write_image(dir.path(), "c.bmp", 40, 30, 2);
    let report_path = reports.path().join("report.json");

    let code = run(&[
        "run",
        dir.path().to_str().unwrap(),
        "--mode",
        "apply",
        "--report",
        report_path.to_str().unwrap(),
        "--no-progress",
    ]);

    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join("a.bmp").exists());
    assert!(!dir.path().join("b.bmp").exists());
    assert!(dir.path().join("c.bmp").exists());

    let report = read_report(&report_path);
    assert_eq!(report.mode, "apply");
    assert!(!report.projected);
    assert_eq!(report.duplicate_groups_count, 1);
    assert_eq!(report.total_duplicates_found, 1);
    assert_eq!(report.cleanup_stats.removed, 1);
    assert_eq!(report.cleanup_stats.files_scanned, 3);
    assert_eq!(report.space_saved_bytes, fs::metadata(&a).unwrap().len());
}

#[test]
fn test_backup_inside_root_is_not_rescanned() {
    let dir = tempdir().unwrap();
    let reports = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 20, 20, 1);
    copy_image(&a, dir.path(), "b.png");
    let backup = dir.path().join("_backup");
    let report_path = reports.path().join("r.json");

    let args = [
        "run",
        dir.path().to_str().unwrap(),
        "--mode",
        "apply",
        "--backup",
        backup.to_str().unwrap(),
        "--report",
        report_path.to_str().unwrap(),
    ];
    assert_eq!(run(&args), ExitCode::Success);
    assert!(backup.join("b.png").exists());

    // The backup copy of b would pair with a if it were scanned
    assert_eq!(run(&args), ExitCode::Success);
    let report = read_report(&report_path);
    assert_eq!(report.duplicate_groups_count, 0);
    assert!(a.exists());
    assert!(backup.join("b.png").exists());
}

#[test]
fn test_scan_command_never_mutates() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 20, 20, 1);
    copy_image(&a, dir.path(), "b.png");
    let before = snapshot(dir.path());

    let code = run(&["scan", dir.path().to_str().unwrap()]);

    assert_eq!(code, ExitCode::Success);
    assert_eq!(snapshot(dir.path()), before);
}

#[cfg(unix)]
#[test]
fn test_failed_backup_keeps_original() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let backup = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 20, 20, 1);
    let b = copy_image(&a, dir.path(), "b.png");
    fs::set_permissions(backup.path(), fs::Permissions::from_mode(0o500)).unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let result = CleanupExecutor::new(&summary.root, CleanupMode::Apply)
        .with_backup_root(backup.path())
        .execute(&groups);

    fs::set_permissions(backup.path(), fs::Permissions::from_mode(0o755)).unwrap();

    // Root ignores directory permissions, in which case the backup succeeds
    if result.failed_count() == 1 {
        assert!(b.exists());
        assert_eq!(result.bytes_reclaimed, 0);
        let failed = result
            .outcomes
            .iter()
            .find(|o| o.status.is_failure())
            .unwrap();
        assert_eq!(failed.status, FileStatus::BackupFailed);
    } else {
        assert!(!b.exists());
        assert!(backup.path().join("b.png").exists());
    }
}

#[cfg(unix)]
#[test]
fn test_apply_with_followed_symlink_keeps_real_image() {
    let dir = tempdir().unwrap();
    let reports = tempdir().unwrap();
    let real = write_image(dir.path(), "b_real.png", 20, 20, 6);
    let link = dir.path().join("a_link.png");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let report_path = reports.path().join("r.json");

    let code = run(&[
        "run",
        dir.path().to_str().unwrap(),
        "--mode",
        "apply",
        "--follow-symlinks",
        "--report",
        report_path.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::Success);
    assert!(real.exists());
    assert!(fs::read(&link).is_ok(), "symlink no longer resolves");
    let report = read_report(&report_path);
    assert_eq!(report.duplicate_groups_count, 0);
    assert_eq!(report.cleanup_stats.links_ignored, 1);
    assert_eq!(report.space_saved_bytes, 0);
}

#[cfg(unix)]
#[test]
fn test_apply_with_followed_symlink_and_real_copy() {
    let dir = tempdir().unwrap();
    let real = write_image(dir.path(), "b_real.png", 20, 20, 6);
    let copy = copy_image(&real, dir.path(), "c_copy.png");
    let link = dir.path().join("a_link.png");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let scan_config = imgdedupe::scanner::ScanConfig {
        follow_symlinks: true,
        ..Default::default()
    };
    let config = imgdedupe::duplicates::FinderConfig::default().with_scan_config(scan_config);
    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);

    let result = CleanupExecutor::new(&summary.root, CleanupMode::Apply).execute(&groups);

    assert_eq!(result.removed_count(), 1);
    assert!(real.exists());
    assert!(!copy.exists());
    assert!(fs::read(&link).is_ok());
}

#[cfg(unix)]
#[test]
fn test_hardlinks_are_not_duplicates() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 20, 20, 7);
    fs::hard_link(&a, dir.path().join("b.png")).unwrap();

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    let result = CleanupExecutor::new(&summary.root, CleanupMode::Apply).execute(&groups);

    assert!(groups.is_empty());
    assert_eq!(summary.aliases_skipped, 1);
    assert_eq!(result.bytes_reclaimed, 0);
    assert!(a.exists());
    assert!(dir.path().join("b.png").exists());
}
