//! Duplicate grouping and keeper selection.
//!
//! Submodules:
//! - [`similarity`]: fingerprint sequence similarity (quick bound + exact ratio)
//! - [`grouper`]: duration-windowed single-link clustering
//! - [`selector`]: quality scoring and keeper recommendation

pub mod grouper;
pub mod selector;
pub mod similarity;

use std::path::PathBuf;

pub use grouper::{find_duplicate_groups, GrouperStats, DURATION_TOLERANCE_SECS};
pub use selector::{quality_score, select_best};

use crate::catalog::{Track, TrackId};

/// One member of a duplicate group, denormalized so scoring and reporting
/// never re-query the catalog.
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub id: TrackId,
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub duration: u32,
    pub bitrate: u32,
    pub sample_rate: u32,
    pub codec: String,
}

impl From<&Track> for GroupMember {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            path: track.path.clone(),
            filename: track.filename.clone(),
            size: track.size,
            duration: track.duration,
            bitrate: track.bitrate,
            sample_rate: track.sample_rate,
            codec: track.codec.clone(),
        }
    }
}

/// A set of two or more tracks judged acoustically similar.
///
/// Ephemeral: computed per analysis run, never persisted. The first member
/// is the seed the group grew around.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub members: Vec<GroupMember>,
}

impl DuplicateGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Combined size of all members.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|m| m.size).sum()
    }

    /// Bytes freed by keeping only the member at `keeper`.
    #[must_use]
    pub fn reclaimable_size(&self, keeper: usize) -> u64 {
        let keeper_size = self.members.get(keeper).map_or(0, |m| m.size);
        self.total_size().saturating_sub(keeper_size)
    }
}
