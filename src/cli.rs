//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Scan the music library with the default catalog and report paths
//! audiodupe ~/Music
//!
//! # Keep the catalog next to a read-only mount, write the report elsewhere
//! audiodupe /mnt/music --db ~/scans/music.db --report ~/scans/dupes.md
//!
//! # Verbose mode for debugging
//! audiodupe -v ~/Music
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Acoustic-fingerprint duplicate audio finder.
///
/// Scans a directory tree for audio files, fingerprints them with fpcalc
/// (chromaprint), finds near-duplicate recordings, and writes a Markdown
/// report recommending which copy of each group to keep. Progress is stored
/// in a catalog database, so interrupted or repeated runs resume instead of
/// redoing work.
#[derive(Debug, Parser)]
#[command(name = "audiodupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan (default: current directory)
    #[arg(value_name = "DIRECTORY", default_value = ".")]
    pub directory: PathBuf,

    /// Path to the catalog database file
    #[arg(long = "db", value_name = "PATH", default_value = "music_scan.db")]
    pub db: PathBuf,

    /// Path to the output Markdown report
    #[arg(
        long,
        value_name = "PATH",
        default_value = "duplicates_report.md"
    )]
    pub report: PathBuf,

    /// Number of fingerprinting workers
    ///
    /// fpcalc is itself CPU-heavy; small values usually win.
    #[arg(long, value_name = "N", default_value = "2")]
    pub workers: usize,

    /// Per-file deadline for external tools, in seconds
    ///
    /// A corrupt file that stalls fpcalc/ffprobe is killed and counted as
    /// a failure instead of hanging the run.
    #[arg(long = "tool-timeout", value_name = "SECS", default_value = "60")]
    pub tool_timeout: u64,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
