//! Reader for Hytale world region files (`.region.bin`).
//!
//! A region file is an IndexedStorage container holding up to 1024 chunks in
//! a 32x32 grid. Each non-empty slot is a Zstandard-compressed blob; the
//! decompressed bytes form a BSON-dialect document tree; block voxel data
//! hides one layer deeper as hex-encoded, palette-indexed section payloads.
//! The layers compose top-down:
//!
//! ```text
//! file bytes -> IndexedStorageReader -> zstd -> Document -> sections/components -> ParsedChunk
//! ```
//!
//! The usual entry point is [`RegionReader`], a pull-based iterator over the
//! file's chunks:
//!
//! ```no_run
//! use hytale_region_parser::RegionReader;
//!
//! # fn main() -> Result<(), hytale_region_parser::RegionError> {
//! let mut reader = RegionReader::open("chunks/0.0.region.bin".as_ref())?;
//! for chunk in reader.by_ref() {
//!     let chunk = chunk?;
//!     println!("chunk ({}, {}): {} block types", chunk.chunk_x, chunk.chunk_z,
//!         chunk.block_names.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Everything is read-only and single-threaded; parallelism, if wanted,
//! belongs to the caller (one reader per file, one owner per reader).

pub mod bson;
pub mod chunk;
pub mod compress;
pub mod cursor;
pub mod error;
pub mod export;
pub mod region;

pub use bson::{Document, Value};
pub use chunk::{
    BlockComponent, ChunkSection, ItemContainer, PaletteEntry, PaletteType, ParsedChunk,
};
pub use cursor::ByteCursor;
pub use error::{DecodeError, RegionError};
pub use region::{
    FailureMode, IndexedStorageReader, RegionPos, RegionReader, RegionSummary, StorageHeader,
};
