//! Error types for the decoder stack.
//!
//! Two levels: [`DecodeError`] describes what went wrong inside the bytes of
//! a single payload (with an offset where one is known), and [`RegionError`]
//! wraps that in file and slot context at region scope.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while decoding one payload (a blob, document or section).
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A read crossed a declared length bound.
    #[error("unexpected end of data at offset {offset} (needed {needed} bytes, {available} available)")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A length-prefixed or NUL-terminated string was malformed.
    #[error("string at offset {offset} is not NUL-terminated")]
    UnterminatedString { offset: usize },

    /// A string carried a nonsensical length prefix.
    #[error("invalid string length {length} at offset {offset}")]
    InvalidStringLength { length: i32, offset: usize },

    /// The document dialect used a type tag this parser does not know.
    #[error("unknown document tag {tag:#04x} at offset {offset}")]
    UnknownDocumentTag { tag: u8, offset: usize },

    /// A document's size prefix disagreed with the bytes actually consumed.
    #[error("document declared {declared} bytes but spans {consumed}")]
    DocumentSizeMismatch { declared: usize, consumed: usize },

    /// A document node had the wrong variant for the field being read.
    #[error("unexpected shape at {path}: expected {expected}")]
    UnexpectedShape {
        path: &'static str,
        expected: &'static str,
    },

    /// A hex-encoded section payload contained a non-hex byte or odd length.
    #[error("invalid hex payload at byte {position}")]
    InvalidHex { position: usize },

    /// A section declared a palette type outside 0..=3.
    #[error("unknown palette type {0}")]
    UnknownPaletteType(u8),

    /// A decoded voxel index referenced a palette entry that does not exist.
    #[error("palette index {index} out of range for {size}-entry palette")]
    PaletteIndexOutOfRange { index: u16, size: usize },

    /// The decompressed blob did not match the length its header declared.
    #[error("decompressed {actual} bytes, blob header declared {expected}")]
    DecompressSizeMismatch { expected: usize, actual: usize },

    /// The Zstandard frame itself was unreadable.
    #[error("zstd decode failed: {0}")]
    DecompressCorrupt(String),
}

/// Failure at region-file scope.
///
/// Every variant names the file; per-chunk failures also carry the slot.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The first 20 bytes are not the `HytaleIndexedStorage` magic.
    #[error("{}: not a HytaleIndexedStorage file", .path.display())]
    BadMagic { path: PathBuf },

    #[error("{}: unsupported storage version {version}", .path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },

    /// The file name does not follow `<x>.<z>.region.bin`.
    #[error("{}: cannot parse region coordinates from file name", .path.display())]
    BadFileName { path: PathBuf },

    /// A non-zero slot index points at a segment outside the file.
    #[error("{}: slot {slot}: segment pointer {segment} is outside the file", .path.display())]
    BadSegmentPointer {
        path: PathBuf,
        slot: usize,
        segment: u32,
    },

    /// Decoding one chunk's payload failed; other slots may still be fine.
    #[error("{}: slot {slot}: {source}", .path.display())]
    Chunk {
        path: PathBuf,
        slot: usize,
        #[source]
        source: DecodeError,
    },
}

impl RegionError {
    /// Whether the error poisons the whole file rather than a single slot.
    pub fn is_file_fatal(&self) -> bool {
        !matches!(self, RegionError::Chunk { .. })
    }

    /// The slot index the error is scoped to, when known.
    pub fn slot(&self) -> Option<usize> {
        match self {
            RegionError::Chunk { slot, .. } | RegionError::BadSegmentPointer { slot, .. } => {
                Some(*slot)
            }
            _ => None,
        }
    }
}
