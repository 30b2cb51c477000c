//! Layered application settings.
//!
//! Sources, lowest to highest priority:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. TOML file: `--config <PATH>`, else `<config dir>/imgdedupe/config.toml`
//! 3. Environment variables prefixed `IMGDEDUPE_` (e.g. `IMGDEDUPE_IO_THREADS=8`)
//! 4. Command-line flags ([`Overrides`])
//!
//! ```toml
//! io_threads = 8
//! mode = "apply"
//! backup = "/mnt/archive/photo-backup"
//! skip_hidden = true
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::CleanupMode;
use crate::cli::{Commands, DetectArgs};
use crate::scanner::fingerprint::DEFAULT_IO_THREADS;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "IMGDEDUPE_";

/// Errors raised while loading settings.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A source could not be parsed or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Effective settings for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fingerprinting pool size
    pub io_threads: usize,
    pub mode: CleanupMode,
    /// Backup root for apply mode
    pub backup: Option<PathBuf>,
    /// Report location; default is timestamped under the root
    pub report: Option<PathBuf>,
    pub follow_symlinks: bool,
    pub skip_hidden: bool,
    /// Re-stat files before deleting and skip changed ones
    pub verify_unchanged: bool,
    /// Use perceptual codes to rule out same-size candidates before decoding
    pub perceptual_prefilter: bool,
    /// Show progress bars
    pub progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            mode: CleanupMode::DryRun,
            backup: None,
            report: None,
            follow_symlinks: false,
            skip_hidden: false,
            verify_unchanged: true,
            perceptual_prefilter: true,
            progress: true,
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<CleanupMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_unchanged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perceptual_prefilter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<bool>,
}

/// `Some(value)` when a boolean flag was passed, `None` otherwise.
fn flag(set: bool, value: bool) -> Option<bool> {
    set.then_some(value)
}

impl Overrides {
    /// Collect the overrides carried by a subcommand.
    #[must_use]
    pub fn from_command(command: &Commands) -> Self {
        let mut overrides = Self::from_detect(command.detect_args());
        if let Commands::Run(args) = command {
            overrides.mode = args.mode.map(CleanupMode::from);
            overrides.backup = args.backup.clone();
            overrides.report = args.report.clone();
            overrides.verify_unchanged = flag(args.no_verify, false);
        }
        overrides
    }

    fn from_detect(args: &DetectArgs) -> Self {
        Self {
            io_threads: args.io_threads,
            follow_symlinks: flag(args.follow_symlinks, true),
            skip_hidden: flag(args.skip_hidden, true),
            perceptual_prefilter: flag(args.no_prefilter, false),
            progress: flag(args.no_progress, false),
            ..Self::default()
        }
    }
}

impl Settings {
    /// Platform default config file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "imgdedupe", "imgdedupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Build the layered figment without CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `config_file` is given but missing.
    pub fn figment(config_file: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        match config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Using config file {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load settings from every layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is missing or malformed, or a
    /// value is out of range.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::figment(config_file)?
            .merge(Serialized::defaults(overrides))
            .extract::<Settings>()
            .map_err(Box::new)?
            .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid(
                "io_threads must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}
