//! SQLite-backed track store.
//!
//! One writer at a time: every call serializes on an internal mutex around
//! the connection, so workers may share a `&TrackStore` freely. The database
//! runs in WAL mode, which keeps readers (including other processes holding
//! the catalog open) unblocked during long processing runs and makes each
//! committed write durable across crashes.
//!
//! Writes are per-row and atomic; no transaction ever spans multiple files.
//! That is what makes an interrupted run resumable: whatever committed is
//! kept, whatever didn't stays unprocessed and is picked up next time.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::codec::{decode_fingerprint, encode_fingerprint};
use super::{AudioMetadata, PendingTrack, Track, TrackId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tracks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    path        TEXT NOT NULL UNIQUE,
    filename    TEXT NOT NULL DEFAULT '',
    size        INTEGER NOT NULL,
    mtime       INTEGER NOT NULL,
    duration    INTEGER NOT NULL DEFAULT 0,
    fingerprint BLOB NOT NULL DEFAULT x'',
    bitrate     INTEGER NOT NULL DEFAULT 0,
    sample_rate INTEGER NOT NULL DEFAULT 0,
    codec       TEXT NOT NULL DEFAULT 'unknown',
    processed   INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_tracks_duration ON tracks(duration);
CREATE INDEX IF NOT EXISTS idx_tracks_processed ON tracks(processed);
";

/// Errors from the track store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An underlying SQLite error.
    #[error("catalog database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A write referenced an id that is not in the catalog.
    #[error("no catalog row with id {0}")]
    UnknownTrack(TrackId),
}

/// Durable, path-keyed record of every audio file seen.
///
/// All methods take `&self`; the store owns its write serialization and is
/// safe to share across worker threads.
pub struct TrackStore {
    conn: Mutex<Connection>,
}

impl TrackStore {
    /// Open (or create) the catalog at `path` and ensure the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL so readers are not blocked while a processing run writes.
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL;", [], |row| row.get(0))?;
        log::debug!("Catalog opened at {} (journal_mode={})", path.display(), mode);
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reconcile a sighted file against the catalog.
    ///
    /// New path: inserts with `processed = 0`, returns the fresh id and
    /// `true`. Known path with matching (size, mtime): returns the existing
    /// id and `false` without performing any write (the fast path during
    /// re-scans of unchanged trees). Known path whose (size, mtime) differ:
    /// updates the signature, flags the row unprocessed, returns `true`.
    pub fn upsert_seen(
        &self,
        path: &Path,
        size: u64,
        mtime: i64,
    ) -> Result<(TrackId, bool), StoreError> {
        let conn = self.conn();
        let key = path.to_string_lossy();
        let key = key.as_ref();

        let existing: Option<(i64, i64, i64)> = conn
            .query_row(
                "SELECT id, size, mtime FROM tracks WHERE path = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO tracks (path, size, mtime, processed) VALUES (?1, ?2, ?3, 0)",
                    params![key, size as i64, mtime],
                )?;
                Ok((TrackId(conn.last_insert_rowid()), true))
            }
            Some((id, db_size, db_mtime)) if db_size == size as i64 && db_mtime == mtime => {
                Ok((TrackId(id), false))
            }
            Some((id, _, _)) => {
                // Staleness is never silently ignored: the row must drop out
                // of the processed set before it can be trusted again.
                conn.execute(
                    "UPDATE tracks SET size = ?1, mtime = ?2, processed = 0 WHERE id = ?3",
                    params![size as i64, mtime, id],
                )?;
                Ok((TrackId(id), true))
            }
        }
    }

    /// List entries awaiting fingerprinting, in insertion order.
    ///
    /// With `root` given, only entries whose path is rooted under that
    /// directory are returned, so a subtree can be processed without
    /// touching the rest of a shared catalog.
    pub fn list_unprocessed(&self, root: Option<&Path>) -> Result<Vec<PendingTrack>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, path, size, mtime FROM tracks WHERE processed = 0 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PendingTrack {
                id: TrackId(row.get(0)?),
                path: std::path::PathBuf::from(row.get::<_, String>(1)?),
                size: row.get::<_, i64>(2)? as u64,
                mtime: row.get(3)?,
            })
        })?;

        let mut pending = Vec::new();
        for row in rows {
            let track = row?;
            if root.is_none_or(|r| track.path.starts_with(r)) {
                pending.push(track);
            }
        }
        Ok(pending)
    }

    /// Record a completed fingerprinting result.
    ///
    /// Atomically sets fingerprint, duration, metadata, the display
    /// `filename` (callers pass the path's base name when the probe did not
    /// supply one) and flags the row processed. Safe to call concurrently
    /// from multiple workers for different ids.
    pub fn record_result(
        &self,
        id: TrackId,
        duration: u32,
        fingerprint: &[u32],
        metadata: &AudioMetadata,
        filename: &str,
    ) -> Result<(), StoreError> {
        let blob = encode_fingerprint(fingerprint);
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE tracks
             SET fingerprint = ?1, duration = ?2, bitrate = ?3, sample_rate = ?4,
                 codec = ?5, filename = ?6, processed = 1
             WHERE id = ?7",
            params![
                blob,
                duration,
                metadata.bitrate,
                metadata.sample_rate,
                metadata.codec,
                filename,
                id.0
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownTrack(id));
        }
        Ok(())
    }

    /// Load every processed track, ordered by duration ascending.
    ///
    /// The ordering is part of the contract: the duplicate grouper's window
    /// scan depends on it. Rows whose fingerprint blob cannot be decoded are
    /// excluded rather than failing the load.
    pub fn list_processed(&self) -> Result<Vec<Track>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, path, filename, size, mtime, duration, fingerprint,
                    bitrate, sample_rate, codec
             FROM tracks WHERE processed = 1
             ORDER BY duration ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Vec<u8>>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, i64>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut tracks = Vec::new();
        for row in rows {
            let (id, path, filename, size, mtime, duration, blob, bitrate, sample_rate, codec) =
                row?;
            let fingerprint = match decode_fingerprint(&blob) {
                Ok(fp) => fp,
                Err(e) => {
                    log::warn!("Skipping track {id} with corrupt fingerprint: {e}");
                    continue;
                }
            };
            tracks.push(Track {
                id: TrackId(id),
                path: std::path::PathBuf::from(path),
                filename,
                size: size as u64,
                mtime,
                duration: duration.max(0) as u32,
                fingerprint,
                bitrate: bitrate.max(0) as u32,
                sample_rate: sample_rate.max(0) as u32,
                codec,
                processed: true,
            });
        }
        Ok(tracks)
    }

    /// Total number of rows in the catalog.
    pub fn track_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir) -> TrackStore {
        TrackStore::open(&dir.path().join("catalog.db")).unwrap()
    }

    #[test]
    fn test_upsert_insert_then_fast_path() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let path = PathBuf::from("/music/a.mp3");

        let (id, pending) = store.upsert_seen(&path, 100, 5000).unwrap();
        assert!(pending);

        let (id2, pending2) = store.upsert_seen(&path, 100, 5000).unwrap();
        assert_eq!(id, id2);
        assert!(!pending2);
        assert_eq!(store.track_count().unwrap(), 1);
    }

    #[test]
    fn test_changed_signature_resets_processed() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let path = PathBuf::from("/music/a.mp3");

        let (id, _) = store.upsert_seen(&path, 100, 5000).unwrap();
        store
            .record_result(id, 90, &[1, 2, 3], &AudioMetadata::unknown(), "a.mp3")
            .unwrap();
        assert!(store.list_unprocessed(None).unwrap().is_empty());

        // Same path, new mtime: the row must reappear as pending.
        let (id2, pending) = store.upsert_seen(&path, 100, 6000).unwrap();
        assert_eq!(id, id2);
        assert!(pending);
        let pending_rows = store.list_unprocessed(None).unwrap();
        assert_eq!(pending_rows.len(), 1);
        assert_eq!(pending_rows[0].id, id);
    }

    #[test]
    fn test_record_result_roundtrip() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let (id, _) = store
            .upsert_seen(&PathBuf::from("/music/song.flac"), 4096, 1234)
            .unwrap();

        let meta = AudioMetadata {
            bitrate: 1_000_000,
            sample_rate: 96_000,
            codec: "flac".to_string(),
        };
        store
            .record_result(id, 181, &[7, 8, 9], &meta, "song.flac")
            .unwrap();

        let tracks = store.list_processed().unwrap();
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.id, id);
        assert_eq!(track.duration, 181);
        assert_eq!(track.fingerprint, vec![7, 8, 9]);
        assert_eq!(track.bitrate, 1_000_000);
        assert_eq!(track.sample_rate, 96_000);
        assert_eq!(track.codec, "flac");
        assert_eq!(track.filename, "song.flac");
        assert!(track.processed);
    }

    #[test]
    fn test_record_result_unknown_id() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let err = store
            .record_result(TrackId(999), 10, &[1], &AudioMetadata::unknown(), "x")
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownTrack(TrackId(999))));
    }

    #[test]
    fn test_list_processed_ordered_by_duration() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        for (name, duration) in [("c.mp3", 300u32), ("a.mp3", 100), ("b.mp3", 200)] {
            let (id, _) = store
                .upsert_seen(&PathBuf::from(format!("/music/{name}")), 10, 1)
                .unwrap();
            store
                .record_result(id, duration, &[1], &AudioMetadata::unknown(), name)
                .unwrap();
        }
        let durations: Vec<u32> = store
            .list_processed()
            .unwrap()
            .iter()
            .map(|t| t.duration)
            .collect();
        assert_eq!(durations, vec![100, 200, 300]);
    }

    #[test]
    fn test_list_unprocessed_prefix_filter() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        store
            .upsert_seen(&PathBuf::from("/library/rock/a.mp3"), 1, 1)
            .unwrap();
        store
            .upsert_seen(&PathBuf::from("/library/jazz/b.mp3"), 1, 1)
            .unwrap();
        store
            .upsert_seen(&PathBuf::from("/elsewhere/c.mp3"), 1, 1)
            .unwrap();

        assert_eq!(store.list_unprocessed(None).unwrap().len(), 3);
        let under_library = store
            .list_unprocessed(Some(Path::new("/library")))
            .unwrap();
        assert_eq!(under_library.len(), 2);
        // Prefix matching is component-aware, not a raw string prefix.
        let under_rock = store
            .list_unprocessed(Some(Path::new("/library/rock")))
            .unwrap();
        assert_eq!(under_rock.len(), 1);
        assert_eq!(under_rock[0].path, PathBuf::from("/library/rock/a.mp3"));
    }

    #[test]
    fn test_concurrent_record_result() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(open_store(&dir));
        let ids: Vec<TrackId> = (0..8)
            .map(|i| {
                store
                    .upsert_seen(&PathBuf::from(format!("/music/{i}.mp3")), 1, 1)
                    .unwrap()
                    .0
            })
            .collect();

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .record_result(
                            id,
                            60,
                            &[id.0 as u32],
                            &AudioMetadata::unknown(),
                            "t.mp3",
                        )
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.list_processed().unwrap().len(), 8);
        assert!(store.list_unprocessed(None).unwrap().is_empty());
    }

    #[test]
    fn test_reopen_preserves_state() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        {
            let store = TrackStore::open(&db_path).unwrap();
            let (id, _) = store
                .upsert_seen(&PathBuf::from("/music/a.mp3"), 10, 20)
                .unwrap();
            store
                .record_result(id, 45, &[1, 2], &AudioMetadata::unknown(), "a.mp3")
                .unwrap();
        }
        let store = TrackStore::open(&db_path).unwrap();
        assert_eq!(store.track_count().unwrap(), 1);
        let tracks = store.list_processed().unwrap();
        assert_eq!(tracks[0].fingerprint, vec![1, 2]);
    }
}
