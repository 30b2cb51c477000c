use clap::Parser;
use imgdedupe::cli::Cli;
use imgdedupe::duplicates::{DuplicateFinder, FinderError};
use imgdedupe::error::{ExitCode, StructuredError};
use std::fs::File;
use tempfile::tempdir;

#[test]
fn test_scan_non_existent_path() {
    let finder = DuplicateFinder::with_defaults();
    let result = finder.find_duplicates(std::path::Path::new("/non/existent/path/12345"));

    match result {
        Err(FinderError::PathNotFound(path)) => {
            assert!(path.to_string_lossy().contains("non/existent/path/12345"));
        }
        _ => panic!("Expected PathNotFound error, got {:?}", result),
    }
}

#[test]
fn test_run_on_missing_root_exits_with_invalid_root() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");
    let cli = Cli::try_parse_from(["imgdedupe", "-q", "run", missing.to_str().unwrap()]).unwrap();

    let err = imgdedupe::run_app(cli).unwrap_err();
    let code = ExitCode::for_error(&err);
    assert_eq!(code, ExitCode::InvalidRoot);
    assert_eq!(code.as_i32(), 2);
}

#[test]
fn test_run_on_file_exits_with_invalid_root() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("photo.png");
    File::create(&file).unwrap();
    let cli = Cli::try_parse_from(["imgdedupe", "-q", "scan", file.to_str().unwrap()]).unwrap();

    let err = imgdedupe::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::InvalidRoot);
}

#[test]
fn test_structured_error_json() {
    let err = anyhow::Error::new(FinderError::Interrupted);
    let code = ExitCode::for_error(&err);
    let json = serde_json::to_value(StructuredError::new(&err, code)).unwrap();

    assert_eq!(json["code"], "ID130");
    assert_eq!(json["exit_code"], 130);
    assert_eq!(json["interrupted"], true);
    assert_eq!(json["message"], "Scan interrupted by user");
}
