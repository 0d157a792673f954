//! Progress reporting utilities using indicatif.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress callback for the fingerprinting pipeline.
///
/// Implement this trait to receive progress updates; the pipeline itself
/// never prints.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts with the number of items it will process.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called as each item completes. `path` is the item just finished.
    fn on_item_done(&self, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Console progress reporter backed by an indicatif bar.
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl ConsoleProgress {
    /// Create a new reporter. With `quiet` set, no bar is drawn.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
    }

    fn lock_bar(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::bar_style());
        bar.set_message(phase.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        *self.lock_bar() = Some(bar);
    }

    fn on_item_done(&self, path: &str) {
        if let Some(bar) = self.lock_bar().as_ref() {
            bar.inc(1);
            // Show only the tail of long paths to keep the bar on one line.
            let display = path.rsplit(['/', '\\']).next().unwrap_or(path);
            bar.set_message(display.to_string());
        }
    }

    fn on_phase_end(&self, _phase: &str) {
        if let Some(bar) = self.lock_bar().take() {
            bar.finish_and_clear();
        }
    }
}
