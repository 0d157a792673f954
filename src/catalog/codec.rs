//! Fingerprint blob encoding.
//!
//! Fingerprints live in the catalog as an opaque byte blob: the integer
//! sequence serialized as little-endian `u32` words. This pair is the only
//! place the encoding exists; everywhere else the in-memory representation
//! is a typed `u32` sequence.

use thiserror::Error;

/// A blob that cannot be decoded back into a `u32` sequence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Blob length is not a whole number of 4-byte words.
    #[error("fingerprint blob length {0} is not a multiple of 4")]
    Truncated(usize),
}

/// Encode a fingerprint as a little-endian `u32` byte blob.
#[must_use]
pub fn encode_fingerprint(fingerprint: &[u32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(fingerprint.len() * 4);
    for value in fingerprint {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a blob produced by [`encode_fingerprint`].
pub fn decode_fingerprint(blob: &[u8]) -> Result<Vec<u32>, CodecError> {
    if blob.len() % 4 != 0 {
        return Err(CodecError::Truncated(blob.len()));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
