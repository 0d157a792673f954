//! Bounded-concurrency fingerprinting pipeline.
//!
//! Drains the catalog's unprocessed set: each unit of work is one track,
//! workers pull independently from the shared list, and every completed
//! item writes back through [`TrackStore::record_result`]. A failed item
//! is collected and reported; its row stays unprocessed so the next run
//! retries it. A single bad file never aborts the batch.
//!
//! The pool is deliberately small. The external extractor is itself
//! CPU/IO-heavy; over-parallelizing it degrades throughput rather than
//! improving it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::command::CommandError;
use super::extractor::{ExtractError, FingerprintExtractor};
use super::probe::MetadataProbe;
use crate::catalog::{AudioMetadata, PendingTrack, TrackStore};
use crate::progress::ProgressCallback;

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 2;

/// Configuration for a pipeline run.
#[derive(Clone, Default)]
pub struct PipelineConfig {
    /// Fixed worker pool size; 0 is treated as 1.
    pub workers: usize,
    /// Optional shutdown flag, observed per item.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("workers", &self.workers)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Configuration with the default worker count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            ..Self::default()
        }
    }

    /// Set the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Classification of a per-item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The extractor exceeded its deadline and was killed.
    Timeout,
    /// The extractor could not be run or reported failure.
    ToolFailed,
    /// The extractor produced output that could not be parsed.
    Parse,
    /// The extractor succeeded but yielded no fingerprint data.
    EmptyFingerprint,
    /// Writing the result back to the catalog failed.
    Store,
}

impl FailureKind {
    fn from_extract_error(err: &ExtractError) -> Self {
        match err {
            ExtractError::Command(CommandError::Timeout { .. }) => Self::Timeout,
            ExtractError::Command(_) | ExtractError::ToolFailed { .. } => Self::ToolFailed,
            ExtractError::Parse(_) => Self::Parse,
            ExtractError::EmptyFingerprint => Self::EmptyFingerprint,
        }
    }
}

/// One failed item, kept for the end-of-run summary.
#[derive(Debug, Clone)]
pub struct ProcessingFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of a pipeline run.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Items fingerprinted and written back.
    pub processed: usize,
    /// Items that failed; their rows remain unprocessed for retry.
    pub failures: Vec<ProcessingFailure>,
    /// Items skipped because shutdown was requested before they started.
    pub skipped: usize,
    /// Whether the run was cut short by a shutdown request.
    pub interrupted: bool,
}

impl PipelineOutcome {
    /// Number of failed items.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

enum ItemOutcome {
    Done,
    Failed(ProcessingFailure),
    Skipped,
}

/// Process every pending track through the extractor and probe.
///
/// Work items are independent and unordered; results are written back in
/// whatever order workers finish. No store lock is held across an external
/// tool invocation.
pub fn process_pending(
    store: &TrackStore,
    pending: Vec<PendingTrack>,
    extractor: &dyn FingerprintExtractor,
    probe: &dyn MetadataProbe,
    config: &PipelineConfig,
) -> PipelineOutcome {
    let mut outcome = PipelineOutcome::default();
    if pending.is_empty() {
        log::info!("No files need fingerprinting");
        return outcome;
    }

    let workers = config.workers.max(1);
    log::info!(
        "Fingerprinting {} files with {} workers",
        pending.len(),
        workers
    );
    if let Some(progress) = &config.progress {
        progress.on_phase_start("fingerprint", pending.len());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Failed to build worker pool ({e}), using global pool");
            rayon::ThreadPoolBuilder::new().build().unwrap()
        });

    let results: Vec<ItemOutcome> = pool.install(|| {
        pending
            .into_par_iter()
            .map(|task| {
                if config.is_shutdown_requested() {
                    return ItemOutcome::Skipped;
                }
                let result = process_one(store, &task, extractor, probe);
                if let Some(progress) = &config.progress {
                    progress.on_item_done(&task.path.to_string_lossy());
                }
                result
            })
            .collect()
    });

    if let Some(progress) = &config.progress {
        progress.on_phase_end("fingerprint");
    }

    for result in results {
        match result {
            ItemOutcome::Done => outcome.processed += 1,
            ItemOutcome::Failed(failure) => outcome.failures.push(failure),
            ItemOutcome::Skipped => outcome.skipped += 1,
        }
    }
    outcome.interrupted = config.is_shutdown_requested();

    log::info!(
        "Fingerprinting complete: {} processed, {} failed, {} skipped",
        outcome.processed,
        outcome.failure_count(),
        outcome.skipped
    );
    for failure in &outcome.failures {
        log::warn!(
            "  {:?}: {} ({})",
            failure.kind,
            failure.path.display(),
            failure.message
        );
    }
    outcome
}

fn process_one(
    store: &TrackStore,
    task: &PendingTrack,
    extractor: &dyn FingerprintExtractor,
    probe: &dyn MetadataProbe,
) -> ItemOutcome {
    let raw = match extractor.extract(&task.path) {
        Ok(raw) => raw,
        Err(e) => {
            return ItemOutcome::Failed(ProcessingFailure {
                path: task.path.clone(),
                kind: FailureKind::from_extract_error(&e),
                message: e.to_string(),
            });
        }
    };

    // Metadata is best-effort: the fingerprint gates `processed`, a probe
    // failure just yields an all-unknown record.
    let metadata = match probe.probe(&task.path) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::debug!("Metadata probe failed for {}: {e}", task.path.display());
            AudioMetadata::unknown()
        }
    };

    let filename = task
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match store.record_result(task.id, raw.duration, &raw.fingerprint, &metadata, &filename) {
        Ok(()) => ItemOutcome::Done,
        Err(e) => ItemOutcome::Failed(ProcessingFailure {
            path: task.path.clone(),
            kind: FailureKind::Store,
            message: e.to_string(),
        }),
    }
}
