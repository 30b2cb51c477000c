use super::fixtures::{copy_image, write_image};
use clap::Parser;
use imgdedupe::cli::Cli;
use imgdedupe::duplicates::GroupKind;
use imgdedupe::error::ExitCode;
use imgdedupe::output::json::REPORT_PREFIX;
use imgdedupe::output::CleanupReport;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn default_reports(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy();
            name.starts_with(REPORT_PREFIX) && name.ends_with(".json")
        })
        .collect()
}

fn run_quiet(root: &Path) -> ExitCode {
    let cli = Cli::try_parse_from(["imgdedupe", "-q", "run", root.to_str().unwrap()]).unwrap();
    imgdedupe::run_app(cli).unwrap()
}

#[test]
fn test_empty_directory_report() {
    let dir = tempdir().unwrap();

    assert_eq!(run_quiet(dir.path()), ExitCode::Success);

    let reports = default_reports(dir.path());
    assert_eq!(reports.len(), 1);
    let report: CleanupReport =
        serde_json::from_str(&fs::read_to_string(&reports[0]).unwrap()).unwrap();
    assert_eq!(report.duplicate_groups_count, 0);
    assert_eq!(report.total_duplicates_found, 0);
    assert_eq!(report.space_saved_bytes, 0);
    assert!(report.duplicate_groups.is_empty());
    assert_eq!(report.mode, "dry_run");
}

#[test]
fn test_dry_run_report_contents() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 50, 40, 1);
    copy_image(&a, dir.path(), "b.png");
    write_image(dir.path(), "c.png", 50, 40, 2);

    assert_eq!(run_quiet(dir.path()), ExitCode::Success);
    assert!(dir.path().join("b.png").exists());

    let reports = default_reports(dir.path());
    assert_eq!(reports.len(), 1);
    let raw = fs::read_to_string(&reports[0]).unwrap();
    let report: CleanupReport = serde_json::from_str(&raw).unwrap();
    let size = fs::metadata(&a).unwrap().len();

    assert!(report.projected);
    assert_eq!(
        Path::new(&report.target_folder),
        dir.path().canonicalize().unwrap()
    );
    assert_eq!(report.duplicate_groups_count, 1);
    assert_eq!(report.total_duplicates_found, 1);
    assert_eq!(report.space_saved_bytes, size);
    assert_eq!(report.cleanup_stats.files_scanned, 3);

    let group = &report.duplicate_groups[0];
    assert_eq!(group.kind, GroupKind::ExactDigest);
    assert_eq!(group.count, 2);
    assert_eq!(group.files.len(), 2);
    assert!(group.kept.ends_with("a.png"));
    assert_eq!(group.reclaimable_bytes, size);

    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for key in [
        "scan_date",
        "target_folder",
        "duplicate_groups_count",
        "total_duplicates_found",
        "space_saved_bytes",
        "space_saved_mb",
        "space_saved_gb",
        "cleanup_stats",
        "duplicate_groups",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["duplicate_groups"][0]["type"], "exact_digest");
}

#[test]
fn test_report_write_failure_is_not_fatal() {
    let dir = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 10, 10, 1);
    copy_image(&a, dir.path(), "b.png");
    let unwritable = dir.path().join("missing-dir").join("report.json");

    let cli = Cli::try_parse_from([
        "imgdedupe",
        "-q",
        "run",
        dir.path().to_str().unwrap(),
        "--mode",
        "apply",
        "--report",
        unwritable.to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(imgdedupe::run_app(cli).unwrap(), ExitCode::Success);
    assert!(!dir.path().join("b.png").exists());
    assert!(!unwritable.exists());
}
