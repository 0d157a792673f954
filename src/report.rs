//! Markdown report rendering.
//!
//! Pure output sink: turns duplicate groups plus keeper selections into a
//! human-readable Markdown document. The core never reads it back.

use std::io::Write;
use std::path::Path;

use bytesize::ByteSize;
use chrono::Local;

use crate::duplicates::{selector, DuplicateGroup};

/// Format a byte count, with a plain "0 bytes" for zero.
fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        "0 bytes".to_string()
    } else {
        ByteSize(bytes).to_string()
    }
}

fn format_bitrate(bitrate: u32) -> String {
    if bitrate == 0 {
        "Unknown".to_string()
    } else {
        format!("{} kbps", bitrate / 1000)
    }
}

fn format_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_uppercase())
        .unwrap_or_default()
}

/// Total bytes freed if only the recommended keeper of each group is kept.
#[must_use]
pub fn total_reclaimable(groups: &[DuplicateGroup]) -> u64 {
    groups
        .iter()
        .map(|group| {
            selector::select_best(group)
                .map(|keeper| group.reclaimable_size(keeper))
                .unwrap_or(0)
        })
        .sum()
}

/// Render the full report document.
#[must_use]
pub fn render_report(groups: &[DuplicateGroup]) -> String {
    let mut out = String::new();
    let reclaimable = total_reclaimable(groups);

    out.push_str("# Audio Duplicates Report\n\n");
    out.push_str(&format!(
        "**Date:** {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!(
        "**Summary:** {} groups found, {} reclaimable\n\n",
        groups.len(),
        format_bytes(reclaimable)
    ));
    out.push_str("---\n\n");

    for (number, group) in groups.iter().enumerate() {
        let keeper = match selector::select_best(group) {
            Some(keeper) => keeper,
            None => continue,
        };
        let best = &group.members[keeper];

        out.push_str(&format!(
            "## Group {} ({} files)\n\n",
            number + 1,
            group.len()
        ));
        out.push_str(&format!("**Recommendation:** keep `{}`\n", best.filename));
        out.push_str(&format!(
            "**Quality:** {} | {}\n\n",
            format_bitrate(best.bitrate),
            format_bytes(best.size)
        ));

        out.push_str("| Keep | Filename | Format | Bitrate | Size | Duration | Path |\n");
        out.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
        for (index, member) in group.members.iter().enumerate() {
            let mark = if index == keeper { "KEEP" } else { "drop" };
            out.push_str(&format!(
                "| {} | **{}** | {} | {} | {} | {}s | `{}` |\n",
                mark,
                member.filename,
                format_extension(&member.path),
                format_bitrate(member.bitrate),
                format_bytes(member.size),
                member.duration,
                member.path.display()
            ));
        }
        out.push_str("\n---\n\n");
    }

    out
}

/// Render and write the report to `path`.
pub fn write_report(path: &Path, groups: &[DuplicateGroup]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(render_report(groups).as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackId;
    use crate::duplicates::GroupMember;
    use std::path::PathBuf;

    fn member(name: &str, size: u64, bitrate: u32) -> GroupMember {
        GroupMember {
            id: TrackId(0),
            path: PathBuf::from(format!("/music/{name}")),
            filename: name.to_string(),
            size,
            duration: 180,
            bitrate,
            sample_rate: 44_100,
            codec: "unknown".to_string(),
        }
    }

    #[test]
    fn test_empty_report_states_zeroes() {
        let report = render_report(&[]);
        assert!(report.contains("0 groups found"));
        assert!(report.contains("0 bytes reclaimable"));
    }

    #[test]
    fn test_group_rendering() {
        let groups = vec![DuplicateGroup {
            members: vec![
                member("song.flac", 30 << 20, 1_000_000),
                member("song.mp3", 5 << 20, 192_000),
            ],
        }];
        let report = render_report(&groups);
        assert!(report.contains("1 groups found"));
        assert!(report.contains("keep `song.flac`"));
        assert!(report.contains("| KEEP | **song.flac**"));
        assert!(report.contains("| drop | **song.mp3**"));
        assert!(report.contains("192 kbps"));
    }

    #[test]
    fn test_total_reclaimable_sums_non_keepers() {
        let groups = vec![DuplicateGroup {
            members: vec![
                member("a.flac", 3000, 1_000_000),
                member("b.mp3", 1000, 192_000),
                member("c.mp3", 500, 128_000),
            ],
        }];
        assert_eq!(total_reclaimable(&groups), 1500);
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_report(&path, &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Audio Duplicates Report"));
    }
}
