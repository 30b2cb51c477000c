use super::fixtures::{copy_image, write_image};
use clap::Parser;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use imgdedupe::actions::CleanupMode;
use imgdedupe::cli::Cli;
use imgdedupe::config::{ConfigError, Overrides, Settings};
use imgdedupe::error::ExitCode;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_settings_round_trip_through_toml() {
    let settings = Settings {
        io_threads: 2,
        mode: CleanupMode::Apply,
        skip_hidden: true,
        ..Settings::default()
    };
    let content = toml::to_string_pretty(&settings).unwrap();
    assert!(content.contains("mode = \"apply\""));
    assert!(content.contains("io_threads = 2"));

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();

    let loaded: Settings = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_config_file_drives_run() {
    let dir = tempdir().unwrap();
    let conf = tempdir().unwrap();
    let a = write_image(dir.path(), "a.png", 12, 12, 1);
    copy_image(&a, dir.path(), "b.png");

    let report = conf.path().join("report.json");
    let config_path = conf.path().join("imgdedupe.toml");
    fs::write(
        &config_path,
        format!(
            "mode = \"apply\"\nprogress = false\nreport = {:?}\n",
            report.to_str().unwrap()
        ),
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "imgdedupe",
        "-q",
        "--config",
        config_path.to_str().unwrap(),
        "run",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(imgdedupe::run_app(cli).unwrap(), ExitCode::Success);

    assert!(!dir.path().join("b.png").exists());
    assert!(report.exists());
}

#[test]
fn test_cli_flag_beats_config_file() {
    let conf = tempdir().unwrap();
    let config_path = conf.path().join("imgdedupe.toml");
    fs::write(&config_path, "mode = \"apply\"\nfollow_symlinks = true\n").unwrap();

    let cli = Cli::try_parse_from(["imgdedupe", "run", "/photos", "--mode", "dry-run"]).unwrap();
    let settings =
        Settings::load(Some(&config_path), &Overrides::from_command(&cli.command)).unwrap();

    assert_eq!(settings.mode, CleanupMode::DryRun);
    assert!(settings.follow_symlinks);
}

#[test]
fn test_missing_config_file_is_fatal() {
    let dir = tempdir().unwrap();
    let cli = Cli::try_parse_from([
        "imgdedupe",
        "-q",
        "--config",
        dir.path().join("absent.toml").to_str().unwrap(),
        "run",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();

    let err = imgdedupe::run_app(cli).unwrap_err();
    assert!(err.downcast_ref::<ConfigError>().is_some());
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_malformed_config_file_is_fatal() {
    let conf = tempdir().unwrap();
    let config_path = conf.path().join("bad.toml");
    fs::write(&config_path, "mode = [not toml").unwrap();

    let result = Settings::load(Some(&config_path), &Overrides::default());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
