//! Change-detecting directory scanner.
//!
//! Walks a directory tree, and for each audio file reconciles it against
//! the track catalog via [`TrackStore::upsert_seen`]. The scan touches only
//! filesystem metadata (size, mtime) and never opens file bytes; a file
//! that cannot be stat-ed is counted and skipped, never aborts the walk.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use crate::catalog::{StoreError, TrackStore};

/// File extensions treated as audio, lowercase without the dot.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "ogg", "opus", "flac", "wav", "aiff", "aif", "wma", "mp4", "3gp", "webm",
];

/// Statistics from a scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Audio files sighted on disk.
    pub files_seen: usize,
    /// Files that are new or whose (size, mtime) changed.
    pub pending: usize,
    /// Files already cataloged with an unchanged signature.
    pub unchanged: usize,
    /// Files skipped because they could not be stat-ed.
    pub errors: usize,
    /// Whether the walk stopped early on a shutdown request.
    pub interrupted: bool,
}

/// Check whether a directory entry is hidden (name starts with `.`).
fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Check whether a path carries an audio extension from the allow-list.
fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let lower = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&lower.as_str())
        })
}

/// Convert a modification time to milliseconds since the Unix epoch.
fn mtime_millis(mtime: SystemTime) -> i64 {
    mtime
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Scan `root` and reconcile every audio file against the catalog.
///
/// Hidden files and directories are skipped. The walk is sequential; the
/// shutdown flag is observed between entries, and a partially completed
/// scan is safe because each `upsert_seen` is independent.
pub fn scan_directory(
    store: &TrackStore,
    root: &Path,
    shutdown_flag: Option<&Arc<AtomicBool>>,
) -> Result<ScanStats, StoreError> {
    let mut stats = ScanStats::default();

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        if shutdown_flag.is_some_and(|f| f.load(Ordering::SeqCst)) {
            stats.interrupted = true;
            break;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry: {e}");
                stats.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                log::debug!("Cannot stat {}: {e}", entry.path().display());
                stats.errors += 1;
                continue;
            }
        };

        stats.files_seen += 1;
        let mtime = metadata.modified().map(mtime_millis).unwrap_or(0);
        let (_, needs_processing) = store.upsert_seen(entry.path(), metadata.len(), mtime)?;
        if needs_processing {
            stats.pending += 1;
        } else {
            stats.unchanged += 1;
        }
    }

    log::info!(
        "Scan complete: {} audio files ({} pending, {} unchanged, {} errors)",
        stats.files_seen,
        stats.pending,
        stats.unchanged,
        stats.errors
    );
    Ok(stats)
}
