//! Human-readable terminal summary.
//!
//! Rendering goes through any [`Write`] so the same code serves stdout and
//! tests. Colors come from `yansi` and are disabled globally by `--no-color`.

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use yansi::Paint;

use super::report::CleanupReport;
use crate::actions::FileStatus;

/// What happened to the report file.
#[derive(Debug, Clone, Copy)]
pub enum ReportStatus<'a> {
    /// Report saved at this path.
    Written(&'a Path),
    /// Writing failed with this message.
    Failed(&'a str),
    /// No report was requested (scan-only).
    NotWritten,
}

/// Write the list of duplicate groups.
///
/// # Errors
///
/// Returns any I/O error from the writer.
pub fn write_groups<W: Write>(writer: &mut W, report: &CleanupReport) -> io::Result<()> {
    for (index, group) in report.duplicate_groups.iter().enumerate() {
        writeln!(
            writer,
            "{} {} ({} files, {} reclaimable)",
            format!("Group {}", index + 1).bold(),
            group.kind.as_str().cyan(),
            group.count,
            ByteSize(group.reclaimable_bytes)
        )?;
        for file in &group.files {
            if *file == group.kept {
                writeln!(writer, "  {} {}", "keep  ".green(), file)?;
            } else {
                writeln!(writer, "  {} {}", "remove".yellow(), file)?;
            }
        }
    }
    Ok(())
}

/// Write the end-of-run summary.
///
/// # Errors
///
/// Returns any I/O error from the writer.
pub fn write_summary<W: Write>(
    writer: &mut W,
    report: &CleanupReport,
    status: ReportStatus<'_>,
) -> io::Result<()> {
    let stats = &report.cleanup_stats;

    writeln!(writer)?;
    writeln!(writer, "{}", "Duplicate image cleanup".bold())?;
    writeln!(writer, "  Mode:              {}", report.mode.as_str().cyan())?;
    writeln!(writer, "  Folder:            {}", report.target_folder)?;
    writeln!(writer, "  Images scanned:    {}", stats.files_scanned)?;
    if stats.files_skipped > 0 || stats.fingerprint_failures > 0 {
        writeln!(
            writer,
            "  Unreadable:        {} skipped, {} failed to fingerprint",
            stats.files_skipped.yellow(),
            stats.fingerprint_failures.yellow()
        )?;
    }
    writeln!(
        writer,
        "  Duplicate groups:  {}",
        report.duplicate_groups_count.bold()
    )?;
    writeln!(
        writer,
        "  Duplicates found:  {}",
        report.total_duplicates_found.bold()
    )?;

    let space = ByteSize(report.space_saved_bytes).to_string();
    if report.projected {
        writeln!(writer, "  Would reclaim:     {}", space.green().bold())?;
    } else {
        writeln!(writer, "  Reclaimed:         {}", space.green().bold())?;
        writeln!(
            writer,
            "  Removed / kept:    {} / {}",
            stats.removed, stats.kept
        )?;
        if stats.failed > 0 {
            writeln!(writer, "  Failed:            {}", stats.failed.red().bold())?;
            for outcome in report.outcomes.iter().filter(|o| o.status.is_failure()) {
                writeln!(
                    writer,
                    "    {} {}",
                    outcome.path,
                    outcome.error.as_deref().unwrap_or("").dim()
                )?;
            }
        }
    }

    if report.interrupted {
        let skipped = report
            .outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Skipped)
            .count();
        writeln!(
            writer,
            "  {}",
            format!("Interrupted: {skipped} candidate(s) left untouched")
                .yellow()
                .bold()
        )?;
    }

    match status {
        ReportStatus::Written(path) => {
            writeln!(writer, "  Report:            {}", path.display())?;
        }
        ReportStatus::Failed(message) => {
            writeln!(
                writer,
                "  Report:            {} {}",
                "not written:".red(),
                message
            )?;
        }
        ReportStatus::NotWritten => {}
    }
    Ok(())
}

/// Print the summary to stdout.
///
/// # Errors
///
/// Returns any I/O error from stdout.
pub fn print_summary(report: &CleanupReport, status: ReportStatus<'_>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_summary(&mut lock, report, status)
}
