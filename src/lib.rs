//! imgdedupe - duplicate image finder and cleaner
//!
//! Images under a root directory are grouped in two tiers: byte-identical
//! files (BLAKE3 digest), then files with equal dimensions and size whose
//! decoded pixels match. One file per group is kept; the rest are reported
//! (dry run) or backed up and deleted (apply). Every run produces a JSON
//! report and a terminal summary.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use actions::{CleanupExecutor, CleanupMode, CleanupPlan};
use cli::{Cli, Commands};
use config::{Overrides, Settings};
use duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, FinderError, ScanSummary};
use error::ExitCode;
use output::{default_report_path, JsonReport, ReportBuilder, ReportStatus};
use progress::{Progress, ProgressCallback};
use scanner::ScanConfig;
use signal::ShutdownHandler;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for fatal conditions only: bad configuration, an
/// unusable root, interruption during detection, or a failure to start the
/// worker pool. Per-file failures are part of the report.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    if cli.no_color {
        yansi::disable();
    }
    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref());

    let overrides = Overrides::from_command(&cli.command);
    let settings = Settings::load(cli.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;
    log::debug!("Effective settings: {:?}", settings);

    let handler = signal::install_handler();
    let progress: Option<Arc<dyn ProgressCallback>> = if settings.progress && !cli.quiet {
        Some(Arc::new(Progress::new(false)))
    } else {
        None
    };

    let app = App {
        settings,
        handler,
        progress,
        quiet: cli.quiet,
    };
    match &cli.command {
        Commands::Run(args) => app.run(&args.detect.path),
        Commands::Scan(args) => app.scan(&args.detect.path),
    }
}

struct App {
    settings: Settings,
    handler: ShutdownHandler,
    progress: Option<Arc<dyn ProgressCallback>>,
    quiet: bool,
}

impl App {
    fn backup_root(&self) -> Option<PathBuf> {
        self.settings.backup.as_deref().map(resolve_dir)
    }

    fn detect(&self, root: &Path) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let mut scan_config = ScanConfig {
            follow_symlinks: self.settings.follow_symlinks,
            skip_hidden: self.settings.skip_hidden,
            ..ScanConfig::default()
        };
        if let Some(backup) = self.backup_root() {
            scan_config = scan_config.with_excluded_dir(backup);
        }

        let mut config = FinderConfig::default()
            .with_io_threads(self.settings.io_threads)
            .with_scan_config(scan_config)
            .with_perceptual_prefilter(self.settings.perceptual_prefilter)
            .with_shutdown_flag(self.handler.get_flag());
        if let Some(ref progress) = self.progress {
            config = config.with_progress_callback(Arc::clone(progress));
        }

        DuplicateFinder::new(config).find_duplicates(root)
    }

    fn run(&self, root: &Path) -> Result<ExitCode> {
        let (groups, summary) = self.detect(root)?;

        let mut executor = CleanupExecutor::new(&summary.root, self.settings.mode)
            .with_verify_unchanged(self.settings.verify_unchanged)
            .with_shutdown_flag(self.handler.get_flag());
        if let Some(backup) = self.backup_root() {
            executor = executor.with_backup_root(backup);
        }
        if let Some(ref progress) = self.progress {
            executor = executor.with_progress_callback(Arc::clone(progress));
        }
        let result = executor.execute(&groups);

        let report = ReportBuilder::new(&summary.root)
            .with_scan_summary(&summary)
            .build(&result);
        let report_path = self
            .settings
            .report
            .clone()
            .unwrap_or_else(|| default_report_path(&summary.root, &report.scan_date));

        let message;
        let status = match JsonReport::new(&report).save(&report_path) {
            Ok(_) => ReportStatus::Written(&report_path),
            Err(e) => {
                log::error!("{e}");
                message = e.to_string();
                ReportStatus::Failed(&message)
            }
        };

        if !self.quiet {
            output::print_summary(&report, status).context("Failed to print summary")?;
        }

        if result.interrupted {
            log::warn!("Cleanup interrupted; remaining candidates were left in place");
            return Ok(ExitCode::Interrupted);
        }
        Ok(ExitCode::Success)
    }

    fn scan(&self, root: &Path) -> Result<ExitCode> {
        let (groups, summary) = self.detect(root)?;

        let result = CleanupExecutor::new(&summary.root, CleanupMode::DryRun)
            .execute_plan(CleanupPlan::build(&groups));
        let report = ReportBuilder::new(&summary.root)
            .with_scan_summary(&summary)
            .build(&result);

        if !self.quiet {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            output::write_groups(&mut out, &report)
                .and_then(|()| output::write_summary(&mut out, &report, ReportStatus::NotWritten))
                .context("Failed to print summary")?;
        }
        Ok(ExitCode::Success)
    }
}

/// Absolute form of a directory that may not exist yet.
fn resolve_dir(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
