//! Fingerprinting and metadata extraction.
//!
//! The core never decodes audio itself. It delegates to two external
//! tools behind trait seams:
//!
//! - [`FingerprintExtractor`]: acoustic fingerprint + nominal duration
//!   (default: `fpcalc` from chromaprint)
//! - [`MetadataProbe`]: bitrate / sample rate / codec (default: `ffprobe`)
//!
//! [`pipeline`] drains the catalog's unprocessed set through both with a
//! small fixed worker pool and writes results back.

mod command;
pub mod extractor;
pub mod pipeline;
pub mod probe;

pub use extractor::{ExtractError, FingerprintExtractor, FpcalcExtractor, RawFingerprint};
pub use pipeline::{FailureKind, PipelineConfig, PipelineOutcome, ProcessingFailure};
pub use probe::{FfprobeProbe, MetadataProbe, ProbeError};

use thiserror::Error;

/// A required external tool is not on PATH.
#[derive(Debug, Error)]
#[error("missing required external tools: {}", missing.join(", "))]
pub struct MissingTools {
    /// Human-readable names of the tools that failed the version check.
    pub missing: Vec<String>,
}

/// Verify that fpcalc and ffprobe are invocable.
///
/// Fatal at startup: the caller reports once and exits non-zero before any
/// scanning occurs.
pub fn ensure_tools() -> Result<(), MissingTools> {
    let mut missing = Vec::new();
    if !command::tool_responds("fpcalc", "-version") {
        missing.push("fpcalc (chromaprint)".to_string());
    }
    if !command::tool_responds("ffprobe", "-version") {
        missing.push("ffprobe (ffmpeg)".to_string());
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingTools { missing })
    }
}
