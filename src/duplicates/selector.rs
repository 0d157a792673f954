//! Quality scoring and keeper selection.
//!
//! Scores each member of a duplicate group from format, bitrate, sample
//! rate and file size, and recommends the highest-scoring copy as the one
//! to keep. Advisory only: nothing is ever deleted or moved.

use std::path::Path;

use super::{DuplicateGroup, GroupMember};

const LOSSLESS_FORMATS: &[&str] = &["flac", "wav", "aiff", "aif", "alac"];
const AAC_FORMATS: &[&str] = &["m4a", "aac"];
const OGG_FORMATS: &[&str] = &["ogg", "opus"];

/// Size bonus cap, in points (one point per MiB up to this).
const SIZE_BONUS_CAP: f64 = 20.0;

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Compute the quality score for one group member.
///
/// Tiers: lossless formats score highest, then the AAC family, then MP3,
/// then Ogg/Opus, with unrecognized formats lowest. Bitrate and sample
/// rate add tiered bonuses; file size adds a small capped bonus as a
/// tie-breaker proxy for quality.
#[must_use]
pub fn quality_score(member: &GroupMember) -> f64 {
    let ext = extension_of(&member.path);

    let mut score: f64 = if LOSSLESS_FORMATS.contains(&ext.as_str()) {
        50.0
    } else if AAC_FORMATS.contains(&ext.as_str()) {
        35.0
    } else if ext == "mp3" {
        30.0
    } else if OGG_FORMATS.contains(&ext.as_str()) {
        25.0
    } else {
        10.0
    };

    if member.bitrate > 0 {
        score += match member.bitrate {
            320_000.. => 30.0,
            256_000.. => 25.0,
            192_000.. => 20.0,
            128_000.. => 15.0,
            _ => 5.0,
        };
    }

    if member.sample_rate > 0 {
        score += match member.sample_rate {
            96_000.. => 20.0,
            48_000.. => 15.0,
            44_100.. => 10.0,
            _ => 5.0,
        };
    }

    score += (member.size as f64 / (1024.0 * 1024.0)).min(SIZE_BONUS_CAP);
    score
}

/// Pick the recommended keeper: the highest-scoring member, with ties
/// broken by first-encountered order.
///
/// Returns the index into `group.members`, or `None` for an empty group.
#[must_use]
pub fn select_best(group: &DuplicateGroup) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, member) in group.members.iter().enumerate() {
        let score = quality_score(member);
        // Strict comparison keeps the earliest member on ties.
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}
