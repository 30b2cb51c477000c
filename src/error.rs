//! Exit codes and structured error output.

use serde::Serialize;

use crate::duplicates::FinderError;

/// Process exit codes.
///
/// - 0: run completed, with or without duplicates or per-file failures
/// - 1: fatal error
/// - 2: root path missing or not a directory
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidRoot = 2,
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "ID000",
            Self::GeneralError => "ID001",
            Self::InvalidRoot => "ID002",
            Self::Interrupted => "ID130",
        }
    }

    /// Classify a fatal error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if let Some(finder) = err.downcast_ref::<FinderError>() {
            if matches!(finder, FinderError::Interrupted) {
                return Self::Interrupted;
            }
            if finder.is_invalid_root() {
                return Self::InvalidRoot;
            }
        }
        Self::GeneralError
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "ID002")
    pub code: String,
    pub exit_code: i32,
    /// Human-readable error message, including causes
    pub message: String,
    pub interrupted: bool,
}

impl StructuredError {
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
