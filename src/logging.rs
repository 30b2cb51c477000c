//! Logging setup.
//!
//! The `log` facade is backed by `env_logger`. The level comes from, in
//! priority order:
//!
//! 1. `RUST_LOG` (if set)
//! 2. `--quiet` (errors only) or `-v` / `-vv` (debug / trace)
//! 3. info
//!
//! With `--log-file` the stream goes to that file instead of stderr.
//!
//! ```rust,no_run
//! use imgdedupe::logging::init_logging;
//!
//! init_logging(1, false, None);
//! log::debug!("visible at -v");
//! ```

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Initialize the logger.
///
/// If the log file cannot be created, logging falls back to stderr and a
/// warning is emitted. Later calls in the same process keep the first logger.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) {
    let use_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }

    let mut file_error = None;
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
                builder.write_style(env_logger::WriteStyle::Never);
            }
            Err(e) => file_error = Some(e),
        }
    }

    configure_format(&mut builder, verbose, log_file.is_some() && file_error.is_none());
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
        return;
    }

    if let (Some(path), Some(e)) = (log_file, file_error) {
        log::warn!(
            "Cannot open log file {}: {}; logging to stderr",
            path.display(),
            e
        );
    }
    if use_env {
        log::debug!("Logging initialized from RUST_LOG");
    } else {
        log::debug!("Logging initialized at level: {:?}", level);
    }
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Terminal output is compact; file output and `-v` carry timestamps and
/// module paths.
fn configure_format(builder: &mut Builder, verbose: u8, to_file: bool) {
    let detailed = to_file || verbose >= 1;
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if detailed {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_seconds(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });
}
