//! Acoustic fingerprint extraction via fpcalc.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use thiserror::Error;

use super::command::{run_with_timeout, CommandError};

/// Default deadline for one fpcalc invocation.
pub const DEFAULT_FPCALC_TIMEOUT: Duration = Duration::from_secs(60);

/// A fingerprinting result: nominal duration plus the raw integer sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFingerprint {
    /// Nominal duration in whole seconds.
    pub duration: u32,
    /// Raw chromaprint fingerprint values.
    pub fingerprint: Vec<u32>,
}

/// Errors from fingerprint extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extractor tool could not run or ran out of time.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The tool ran but reported failure (unreadable, corrupt, non-audio).
    #[error("fpcalc exited with {status}: {stderr}")]
    ToolFailed { status: i32, stderr: String },

    /// The tool produced output the parser does not understand.
    #[error("unparseable fpcalc output: {0}")]
    Parse(String),

    /// The tool succeeded but produced no fingerprint data.
    #[error("empty fingerprint")]
    EmptyFingerprint,
}

/// Computes an acoustic fingerprint for a file.
///
/// Contract: deterministic for a given file's audio content; an error (or
/// empty sequence, reported as [`ExtractError::EmptyFingerprint`]) on
/// unreadable, corrupt, or non-audio input; never hangs indefinitely.
pub trait FingerprintExtractor: Send + Sync {
    /// Fingerprint the file at `path`.
    fn extract(&self, path: &Path) -> Result<RawFingerprint, ExtractError>;
}

/// [`FingerprintExtractor`] backed by the `fpcalc` binary from chromaprint.
///
/// Runs `fpcalc -raw <file>` and parses the `DURATION=`/`FINGERPRINT=`
/// key-value output. Raw mode yields the integer fingerprint directly.
pub struct FpcalcExtractor {
    timeout: Duration,
}

impl FpcalcExtractor {
    /// Create an extractor with the given per-file deadline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for FpcalcExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_FPCALC_TIMEOUT)
    }
}

impl FingerprintExtractor for FpcalcExtractor {
    fn extract(&self, path: &Path) -> Result<RawFingerprint, ExtractError> {
        let mut cmd = Command::new("fpcalc");
        cmd.arg("-raw").arg(path);
        let output = run_with_timeout("fpcalc", cmd, self.timeout)?;

        if !output.status.success() {
            return Err(ExtractError::ToolFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_fpcalc_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse fpcalc `-raw` key-value output.
fn parse_fpcalc_output(stdout: &str) -> Result<RawFingerprint, ExtractError> {
    let mut duration: Option<u32> = None;
    let mut fingerprint: Vec<u32> = Vec::new();

    for line in stdout.lines() {
        if let Some(value) = line.strip_prefix("DURATION=") {
            // fpcalc prints whole seconds, but tolerate a fractional value.
            let secs = value
                .trim()
                .parse::<f64>()
                .map_err(|_| ExtractError::Parse(format!("bad duration {value:?}")))?;
            duration = Some(secs.max(0.0) as u32);
        } else if let Some(value) = line.strip_prefix("FINGERPRINT=") {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            fingerprint = value
                .split(',')
                .map(|item| {
                    item.trim()
                        .parse::<u32>()
                        .map_err(|_| ExtractError::Parse(format!("bad fingerprint item {item:?}")))
                })
                .collect::<Result<_, _>>()?;
        }
    }

    let duration = duration.ok_or_else(|| ExtractError::Parse("missing DURATION".to_string()))?;
    if fingerprint.is_empty() {
        return Err(ExtractError::EmptyFingerprint);
    }
    Ok(RawFingerprint {
        duration,
        fingerprint,
    })
}
