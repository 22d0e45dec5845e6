//! Zstandard blob decompression.
//!
//! Blobs carry their decompressed size in the container framing, so the
//! decoder is bounded up front and the produced length is checked against
//! the declaration.

use crate::error::DecodeError;

/// Decompress one Zstandard frame into exactly `expected_size` bytes.
pub fn decompress(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>, DecodeError> {
    let out = zstd::bulk::decompress(compressed, expected_size)
        .map_err(|e| DecodeError::DecompressCorrupt(e.to_string()))?;
    if out.len() != expected_size {
        return Err(DecodeError::DecompressSizeMismatch {
            expected: expected_size,
            actual: out.len(),
        });
    }
    Ok(out)
}
