//! Command-line interface definitions for imgdedupe.
//!
//! Global options (verbosity, color, error format, config file) apply to every
//! subcommand. Flags left unset fall through to the config file and
//! `IMGDEDUPE_*` environment variables, see [`crate::config`].
//!
//! # Example
//!
//! ```bash
//! # Preview what would be removed
//! imgdedupe run ~/Pictures
//!
//! # Remove duplicates, keeping a mirrored backup
//! imgdedupe run ~/Pictures --mode apply --backup ~/dupe-backup
//!
//! # Only list duplicate groups
//! imgdedupe -v scan ~/Pictures
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::actions::CleanupMode;

/// Find and safely remove duplicate images.
///
/// Images are grouped when they are byte-identical or decode to the same
/// pixels. One file per group is kept (largest, then oldest); the rest are
/// removed in apply mode, optionally after a mirrored backup.
#[derive(Debug, Parser)]
#[command(name = "imgdedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Write the log to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect duplicates and clean them up (dry run unless --mode apply)
    Run(RunArgs),
    /// Detect and list duplicate groups without touching any file
    Scan(ScanArgs),
}

impl Commands {
    /// Detection options shared by both subcommands.
    #[must_use]
    pub fn detect_args(&self) -> &DetectArgs {
        match self {
            Self::Run(args) => &args.detect,
            Self::Scan(args) => &args.detect,
        }
    }
}

/// Options controlling traversal and detection.
#[derive(Debug, Clone, Args)]
pub struct DetectArgs {
    /// Root directory to scan
    #[arg(value_name = "ROOT")]
    pub path: PathBuf,

    /// Number of I/O threads for fingerprinting (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Follow symbolic links during scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Decode and compare every same-size candidate pair without the
    /// perceptual-hash shortcut
    #[arg(long)]
    pub no_prefilter: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the run subcommand.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub detect: DetectArgs,

    /// Cleanup mode
    #[arg(short, long, value_enum, value_name = "MODE")]
    pub mode: Option<ModeArg>,

    /// Copy every removed file here first, mirroring its path under ROOT
    #[arg(short, long, value_name = "DIR")]
    pub backup: Option<PathBuf>,

    /// Report location (default: ROOT/duplicate_cleanup_report_<timestamp>.json)
    #[arg(short, long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Delete even if a file changed since it was scanned
    #[arg(long)]
    pub no_verify: bool,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub detect: DetectArgs,
}

/// Cleanup mode as accepted on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Report what would be removed, change nothing
    #[default]
    DryRun,
    /// Back up (if configured) and delete duplicates
    Apply,
}

impl From<ModeArg> for CleanupMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::DryRun => CleanupMode::DryRun,
            ModeArg::Apply => CleanupMode::Apply,
        }
    }
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeArg::DryRun => write!(f, "dry-run"),
            ModeArg::Apply => write!(f, "apply"),
        }
    }
}
