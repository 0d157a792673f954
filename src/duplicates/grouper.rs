//! Duration-windowed duplicate grouping.
//!
//! Comparing every pair of N fingerprints is O(N²); this scan exploits the
//! fact that near-duplicates of the same recording share nominal duration
//! to within a few seconds. Tracks arrive sorted by duration ascending
//! (a [`TrackStore::list_processed`] guarantee), so each seed only scans
//! forward while the duration difference stays inside the tolerance — a
//! hard cutoff, not a heuristic.
//!
//! Grouping is seed-centered single-link clustering: once a track lands in
//! a group it is consumed, never revisited as a seed or as a candidate for
//! later seeds, so no id appears in two groups. A seed that matched nothing
//! is *not* consumed; it stays visible as a candidate for later seeds with
//! a nearby duration. This is a documented approximation, not exhaustive
//! clique-finding.

use std::collections::HashSet;

use super::similarity::{quick_ratio, ratio};
use super::{DuplicateGroup, GroupMember};
use crate::catalog::{Track, TrackId};

/// Maximum nominal-duration difference, in seconds, for two tracks to be
/// considered as a candidate pair. Generous enough to absorb container and
/// transcoding rounding.
pub const DURATION_TOLERANCE_SECS: u32 = 3;

/// Quick-ratio floor below which a pair is rejected without computing the
/// exact ratio.
pub const QUICK_RATIO_FLOOR: f64 = 0.6;

/// Exact ratio a pair must exceed (strictly) to count as duplicates.
pub const MATCH_RATIO_THRESHOLD: f64 = 0.80;

/// Counters from a grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrouperStats {
    /// Tracks that entered the scan (processed, usable fingerprint).
    pub tracks_considered: usize,
    /// Tracks excluded up front (zero duration or empty fingerprint).
    pub tracks_excluded: usize,
    /// Candidate pairs inside the duration window.
    pub candidate_pairs: usize,
    /// Pairs rejected by the quick bound alone.
    pub quick_rejects: usize,
    /// Pairs that went on to the exact ratio computation.
    pub full_comparisons: usize,
    /// Groups produced.
    pub groups_found: usize,
}

/// Cluster processed tracks into duplicate groups.
///
/// `tracks` must be sorted by duration ascending. Tracks with a zero
/// duration or an empty fingerprint are excluded before the scan: they are
/// never matched and never reported.
#[must_use]
pub fn find_duplicate_groups(tracks: &[Track]) -> (Vec<DuplicateGroup>, GrouperStats) {
    let mut stats = GrouperStats::default();

    let usable: Vec<&Track> = tracks
        .iter()
        .filter(|t| t.duration > 0 && !t.fingerprint.is_empty())
        .collect();
    stats.tracks_excluded = tracks.len() - usable.len();
    stats.tracks_considered = usable.len();
    debug_assert!(
        usable.windows(2).all(|w| w[0].duration <= w[1].duration),
        "grouper input must be sorted by duration"
    );

    let mut consumed: HashSet<TrackId> = HashSet::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for (i, seed) in usable.iter().enumerate() {
        if consumed.contains(&seed.id) {
            continue;
        }

        let mut members: Vec<GroupMember> = Vec::new();
        for candidate in &usable[i + 1..] {
            // Sorted input makes this a hard cutoff for the forward scan.
            if candidate.duration - seed.duration > DURATION_TOLERANCE_SECS {
                break;
            }
            if consumed.contains(&candidate.id) {
                continue;
            }

            stats.candidate_pairs += 1;
            if quick_ratio(&seed.fingerprint, &candidate.fingerprint) < QUICK_RATIO_FLOOR {
                stats.quick_rejects += 1;
                continue;
            }
            stats.full_comparisons += 1;
            if ratio(&seed.fingerprint, &candidate.fingerprint) > MATCH_RATIO_THRESHOLD {
                members.push(GroupMember::from(*candidate));
                consumed.insert(candidate.id);
            }
        }

        if !members.is_empty() {
            consumed.insert(seed.id);
            members.insert(0, GroupMember::from(*seed));
            groups.push(DuplicateGroup { members });
        }
        // A childless seed is not consumed: it stays comparable as a
        // candidate for later seeds with a nearby duration.
    }

    stats.groups_found = groups.len();
    log::info!(
        "Analysis complete: {} groups among {} tracks ({} pairs, {} quick-rejected)",
        stats.groups_found,
        stats.tracks_considered,
        stats.candidate_pairs,
        stats.quick_rejects
    );
    (groups, stats)
}
