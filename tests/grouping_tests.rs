//! End-to-end grouping scenarios through the store, grouper, selector and
//! report.

use std::path::Path;

use audiodupe::catalog::{AudioMetadata, TrackStore};
use audiodupe::duplicates::{find_duplicate_groups, selector};
use audiodupe::report;
use tempfile::tempdir;

fn base_fp() -> Vec<u32> {
    (0..100).collect()
}

/// Shares `shared` leading values with [`base_fp`], padded to 100 values.
fn similar_fp(shared: u32, salt: u32) -> Vec<u32> {
    let mut fp: Vec<u32> = (0..shared).collect();
    fp.extend(10_000 + salt * 1000..10_000 + salt * 1000 + (100 - shared));
    fp
}

fn insert_processed(
    store: &TrackStore,
    path: &str,
    duration: u32,
    fingerprint: &[u32],
    metadata: AudioMetadata,
) {
    let (id, _) = store.upsert_seen(Path::new(path), 1000, 1).unwrap();
    let filename = Path::new(path).file_name().unwrap().to_string_lossy();
    store
        .record_result(id, duration, fingerprint, &metadata, &filename)
        .unwrap();
}

#[test]
fn test_three_track_scenario_with_keeper() {
    let state = tempdir().unwrap();
    let store = TrackStore::open(&state.path().join("catalog.db")).unwrap();

    // A (100s, FLAC/1000kbps) and B (101s, MP3/192kbps) share a 0.95-ratio
    // fingerprint; C (200s) is unrelated.
    insert_processed(
        &store,
        "/music/a.flac",
        100,
        &base_fp(),
        AudioMetadata {
            bitrate: 1_000_000,
            sample_rate: 44_100,
            codec: "flac".to_string(),
        },
    );
    insert_processed(
        &store,
        "/music/b.mp3",
        101,
        &similar_fp(95, 1),
        AudioMetadata {
            bitrate: 192_000,
            sample_rate: 44_100,
            codec: "mp3".to_string(),
        },
    );
    insert_processed(
        &store,
        "/music/c.mp3",
        200,
        &(500..600).collect::<Vec<u32>>(),
        AudioMetadata {
            bitrate: 320_000,
            sample_rate: 44_100,
            codec: "mp3".to_string(),
        },
    );

    let tracks = store.list_processed().unwrap();
    let (groups, stats) = find_duplicate_groups(&tracks);

    assert_eq!(groups.len(), 1);
    assert_eq!(stats.groups_found, 1);
    let group = &groups[0];
    assert_eq!(group.len(), 2);
    let names: Vec<&str> = group.members.iter().map(|m| m.filename.as_str()).collect();
    assert_eq!(names, vec!["a.flac", "b.mp3"]);

    // FLAC/1000kbps beats MP3/192kbps.
    let keeper = selector::select_best(group).unwrap();
    assert_eq!(group.members[keeper].filename, "a.flac");

    let rendered = report::render_report(&groups);
    assert!(rendered.contains("1 groups found"));
    assert!(rendered.contains("keep `a.flac`"));
    assert!(!rendered.contains("c.mp3"));
}

#[test]
fn test_empty_catalog_end_to_end() {
    let state = tempdir().unwrap();
    let report_path = state.path().join("report.md");
    let store = TrackStore::open(&state.path().join("catalog.db")).unwrap();

    assert_eq!(store.track_count().unwrap(), 0);
    let tracks = store.list_processed().unwrap();
    let (groups, _) = find_duplicate_groups(&tracks);
    assert!(groups.is_empty());

    report::write_report(&report_path, &groups).unwrap();
    let rendered = std::fs::read_to_string(&report_path).unwrap();
    assert!(rendered.contains("0 groups found"));
    assert!(rendered.contains("0 bytes reclaimable"));
}

#[test]
fn test_grouping_never_crosses_duration_window() {
    let state = tempdir().unwrap();
    let store = TrackStore::open(&state.path().join("catalog.db")).unwrap();

    // Identical fingerprints spread across durations; only tracks within
    // 3 seconds of a seed may share its group.
    for (name, duration) in [
        ("a.mp3", 100u32),
        ("b.mp3", 102),
        ("c.mp3", 110),
        ("d.mp3", 111),
    ] {
        insert_processed(
            &store,
            &format!("/music/{name}"),
            duration,
            &base_fp(),
            AudioMetadata::unknown(),
        );
    }

    let tracks = store.list_processed().unwrap();
    let (groups, _) = find_duplicate_groups(&tracks);

    assert_eq!(groups.len(), 2);
    for group in &groups {
        let min = group.members.iter().map(|m| m.duration).min().unwrap();
        let max = group.members.iter().map(|m| m.duration).max().unwrap();
        assert!(max - min <= 3);
    }
}

#[test]
fn test_every_id_in_at_most_one_group() {
    let state = tempdir().unwrap();
    let store = TrackStore::open(&state.path().join("catalog.db")).unwrap();

    for i in 0..12u32 {
        // Four clusters of three similar tracks each.
        let cluster = i / 3;
        let mut fp: Vec<u32> = (cluster * 10_000..cluster * 10_000 + 95).collect();
        fp.extend(90_000 + i * 100..90_000 + i * 100 + 5);
        insert_processed(
            &store,
            &format!("/music/{i:02}.mp3"),
            100 + cluster,
            &fp,
            AudioMetadata::unknown(),
        );
    }

    let tracks = store.list_processed().unwrap();
    let (groups, _) = find_duplicate_groups(&tracks);

    assert_eq!(groups.len(), 4);
    let mut seen = std::collections::HashSet::new();
    for member in groups.iter().flat_map(|g| &g.members) {
        assert!(seen.insert(member.id), "track grouped twice");
    }
    assert_eq!(seen.len(), 12);
}

#[test]
fn test_corrupt_duration_rows_excluded() {
    let state = tempdir().unwrap();
    let store = TrackStore::open(&state.path().join("catalog.db")).unwrap();

    insert_processed(&store, "/music/zero.mp3", 0, &base_fp(), AudioMetadata::unknown());
    insert_processed(&store, "/music/ok.mp3", 100, &base_fp(), AudioMetadata::unknown());

    let tracks = store.list_processed().unwrap();
    let (groups, stats) = find_duplicate_groups(&tracks);
    assert!(groups.is_empty());
    assert_eq!(stats.tracks_excluded, 1);
}
