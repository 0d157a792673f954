//! Technical metadata probing via ffprobe.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::command::{run_with_timeout, CommandError};
use crate::catalog::AudioMetadata;

/// Default deadline for one ffprobe invocation.
pub const DEFAULT_FFPROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from metadata probing.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe tool could not run or ran out of time.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The tool ran but reported failure.
    #[error("ffprobe exited with {status}: {stderr}")]
    ToolFailed { status: i32, stderr: String },

    /// The tool produced JSON the parser does not understand.
    #[error("unparseable ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),

    /// The file has no audio stream at all.
    #[error("no audio stream")]
    NoAudioStream,
}

/// Extracts technical audio metadata for a file.
///
/// Best-effort by contract: zero/"unknown" field values are valid results,
/// not errors, when the underlying stream lacks the field.
pub trait MetadataProbe: Send + Sync {
    /// Probe the file at `path`.
    fn probe(&self, path: &Path) -> Result<AudioMetadata, ProbeError>;
}

/// [`MetadataProbe`] backed by the `ffprobe` binary from ffmpeg.
pub struct FfprobeProbe {
    timeout: Duration,
}

impl FfprobeProbe {
    /// Create a probe with the given per-file deadline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new(DEFAULT_FFPROBE_TIMEOUT)
    }
}

/// ffprobe JSON output, trimmed to the fields the catalog stores.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    bit_rate: Option<String>,
}

impl MetadataProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<AudioMetadata, ProbeError> {
        let mut cmd = Command::new("ffprobe");
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
            "-select_streams",
            "a:0",
        ])
        .arg(path);
        let output = run_with_timeout("ffprobe", cmd, self.timeout)?;

        if !output.status.success() {
            return Err(ProbeError::ToolFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
        metadata_from_output(parsed)
    }
}

fn parse_numeric(value: Option<&String>) -> u32 {
    value
        .and_then(|v| v.parse::<u64>().ok())
        .map(|v| v.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

fn metadata_from_output(parsed: FfprobeOutput) -> Result<AudioMetadata, ProbeError> {
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or(ProbeError::NoAudioStream)?;

    // Stream bitrate when present, container bitrate as the fallback
    // (FLAC and some containers only report it at the format level).
    let bitrate = match parse_numeric(stream.bit_rate.as_ref()) {
        0 => parse_numeric(parsed.format.as_ref().and_then(|f| f.bit_rate.as_ref())),
        rate => rate,
    };

    Ok(AudioMetadata {
        bitrate,
        sample_rate: parse_numeric(stream.sample_rate.as_ref()),
        codec: stream
            .codec_name
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<AudioMetadata, ProbeError> {
        metadata_from_output(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_full_metadata() {
        let meta = parse(
            r#"{
                "streams": [{
                    "codec_type": "audio",
                    "codec_name": "flac",
                    "sample_rate": "96000",
                    "bit_rate": "1411200"
                }],
                "format": {"bit_rate": "1500000"}
            }"#,
        )
        .unwrap();
        assert_eq!(meta.codec, "flac");
        assert_eq!(meta.sample_rate, 96_000);
        assert_eq!(meta.bitrate, 1_411_200);
    }

    #[test]
    fn test_format_bitrate_fallback() {
        let meta = parse(
            r#"{
                "streams": [{"codec_type": "audio", "codec_name": "flac", "sample_rate": "44100"}],
                "format": {"bit_rate": "987654"}
            }"#,
        )
        .unwrap();
        assert_eq!(meta.bitrate, 987_654);
    }

    #[test]
    fn test_missing_fields_default_to_unknown() {
        let meta = parse(r#"{"streams": [{"codec_type": "audio"}]}"#).unwrap();
        assert_eq!(meta.bitrate, 0);
        assert_eq!(meta.sample_rate, 0);
        assert_eq!(meta.codec, "unknown");
    }

    #[test]
    fn test_no_audio_stream() {
        let err = parse(r#"{"streams": [{"codec_type": "video"}]}"#).unwrap_err();
        assert!(matches!(err, ProbeError::NoAudioStream));

        let err = parse(r#"{"streams": []}"#).unwrap_err();
        assert!(matches!(err, ProbeError::NoAudioStream));
    }
}
