//! Application orchestration: scan → fingerprint → analyze → report.
//!
//! Every phase writes its progress to the catalog as it goes, so the run
//! can be interrupted at any point and re-invoked; `list_unprocessed` is
//! the natural resume point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::analysis::{self, FfprobeProbe, FpcalcExtractor, PipelineConfig};
use crate::catalog::TrackStore;
use crate::cli::Cli;
use crate::duplicates::grouper;
use crate::error::ExitCode;
use crate::progress::ConsoleProgress;
use crate::{logging, report, scanner, signal};

/// Run the full application. Returns the process exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    // Environment checks come first: fail once, before any scanning.
    if let Err(e) = analysis::ensure_tools() {
        log::error!("{e}");
        log::error!("Install chromaprint and ffmpeg (e.g. apt install libchromaprint-tools ffmpeg)");
        return Ok(ExitCode::EnvironmentError);
    }

    let root = match std::fs::canonicalize(&cli.directory) {
        Ok(root) if root.is_dir() => root,
        _ => {
            log::error!("Directory not found: {}", cli.directory.display());
            return Ok(ExitCode::EnvironmentError);
        }
    };

    let store = TrackStore::open(&cli.db)
        .with_context(|| format!("cannot open catalog at {}", cli.db.display()))?;
    let handler = signal::install_handler()?;

    // Phase 1: scan and reconcile.
    log::info!("Scanning {}", root.display());
    let scan_stats = scanner::scan_directory(&store, &root, Some(&handler.get_flag()))?;
    if scan_stats.interrupted {
        return Ok(resumable_exit());
    }

    // Phase 2: fingerprint whatever the scan left pending under this root.
    let pending = store.list_unprocessed(Some(&root))?;
    let timeout = Duration::from_secs(cli.tool_timeout);
    let pipeline_config = PipelineConfig::new()
        .with_workers(cli.workers)
        .with_shutdown_flag(handler.get_flag())
        .with_progress(Arc::new(ConsoleProgress::new(cli.quiet)));
    let outcome = analysis::pipeline::process_pending(
        &store,
        pending,
        &FpcalcExtractor::new(timeout),
        &FfprobeProbe::new(timeout.min(Duration::from_secs(30))),
        &pipeline_config,
    );
    if outcome.interrupted {
        return Ok(resumable_exit());
    }
    if outcome.failure_count() > 0 {
        log::warn!(
            "{} files failed fingerprinting and will be retried next run",
            outcome.failure_count()
        );
    }

    // Phase 3: group duplicates.
    let tracks = store.list_processed()?;
    let (groups, _stats) = grouper::find_duplicate_groups(&tracks);

    // Phase 4: report.
    report::write_report(&cli.report, &groups)
        .with_context(|| format!("cannot write report to {}", cli.report.display()))?;
    log::info!(
        "Done: {} duplicate groups, report written to {}",
        groups.len(),
        cli.report.display()
    );

    if outcome.failure_count() > 0 {
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}

fn resumable_exit() -> ExitCode {
    log::info!("Interrupted. Progress is saved; run again to resume.");
    ExitCode::Success
}
