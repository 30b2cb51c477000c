//! Ctrl+C handling.
//!
//! A single `Arc<AtomicBool>` is set by the `ctrlc` hook and threaded into the
//! walker, the fingerprinting pool and the cleanup executor. Detection stops
//! with [`crate::duplicates::FinderError::Interrupted`]; cleanup stops before
//! the next deletion and keeps what was already removed.
//!
//! ```rust,no_run
//! use imgdedupe::duplicates::FinderConfig;
//! use imgdedupe::signal::install_handler;
//!
//! let handler = install_handler();
//! let config = FinderConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once Ctrl+C was pressed or [`Self::request_shutdown`] called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag for the pipeline stages.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// Repeated calls (e.g. several `run_app` invocations in one test process)
/// return the already-installed handler with its flag cleared. If another
/// hook owns the signal, an unhooked handler is returned; it still honors
/// [`ShutdownHandler::request_shutdown`].
#[must_use]
pub fn install_handler() -> ShutdownHandler {
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();
        let installed = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\nInterrupted. Finishing current file...");
            let _ = stderr.flush();
            log::info!("Shutdown signal received");
        });
        if let Err(e) = installed {
            log::debug!("Ctrl+C handler not installed ({e}), using unhooked handler");
        }
        handler
    });
    handler.reset();
    handler.clone()
}
