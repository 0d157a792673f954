//! Signal handling for graceful shutdown.
//!
//! Centralized Ctrl+C handling built on an `AtomicBool` flag shared across
//! worker threads. Every phase of a run writes its progress to the catalog
//! as it goes, so an interrupted run only needs to stop cleanly; the next
//! invocation resumes from `TrackStore::list_unprocessed`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shutdown handler wrapping the shared interrupt flag.
///
/// The flag is set when a termination signal is received. Clones share the
/// same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a new handler with the flag initially unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the flag for passing to worker threads.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Install the Ctrl+C handler and return the shared [`ShutdownHandler`].
///
/// The handler only flips the flag; the scan and processing loops observe
/// it between items and stop at the next safe point.
pub fn install_handler() -> anyhow::Result<ShutdownHandler> {
    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            // Second signal: the user really wants out.
            eprintln!("\nForced exit.");
            std::process::exit(130);
        }
        eprintln!("\nInterrupt received. Finishing in-flight items; progress is saved.");
    })?;

    Ok(handler)
}
