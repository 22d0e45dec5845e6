//! IndexedStorage container reader.
//!
//! On-disk layout, all integers big-endian:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 20 | magic `HytaleIndexedStorage` |
//! | 20 | 4 | version (0 or 1) |
//! | 24 | 4 | blob count (observed 1024) |
//! | 28 | 4 | segment size in bytes |
//! | 32 | blob_count x 4 | slot index table |
//!
//! A slot index value of 0 marks an empty slot. Any non-zero value `s` maps
//! to the segment starting at `segments_base + (s - 1) * segment_size`; that
//! mapping is the producer's and is mirrored bit-exactly. Each segment opens
//! with a blob header: u32 decompressed length, u32 compressed length, then
//! the Zstandard frame.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::RegionError;

/// The 20-byte magic every region file opens with.
pub const MAGIC: &[u8; 20] = b"HytaleIndexedStorage";

const HEADER_LENGTH: u64 = 32;

/// Fixed header fields of an open container.
#[derive(Debug, Clone, Copy)]
pub struct StorageHeader {
    pub version: u32,
    pub blob_count: u32,
    pub segment_size: u32,
}

/// One slot's compressed payload, still in its Zstandard frame.
#[derive(Debug)]
pub struct Blob {
    /// Decompressed byte count declared by the blob header.
    pub source_length: u32,
    /// The compressed frame bytes.
    pub data: Vec<u8>,
}

/// Open region file with its slot index loaded.
///
/// The file handle lives as long as the reader; payloads are read on demand
/// with a seek per slot.
pub struct IndexedStorageReader {
    path: PathBuf,
    file: File,
    file_len: u64,
    header: StorageHeader,
    slot_index: Vec<u32>,
}

impl IndexedStorageReader {
    /// Open a region file, validate the header and load the slot index.
    pub fn open(path: &Path) -> Result<Self, RegionError> {
        let io_err = |source| RegionError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let file_len = file.metadata().map_err(io_err)?.len();

        let mut fixed = [0u8; HEADER_LENGTH as usize];
        if file.read_exact(&mut fixed).is_err() || &fixed[..20] != MAGIC {
            // A file too short to hold the header cannot carry the magic.
            return Err(RegionError::BadMagic {
                path: path.to_path_buf(),
            });
        }

        let version = u32::from_be_bytes(fixed[20..24].try_into().unwrap());
        if version > 1 {
            return Err(RegionError::UnsupportedVersion {
                path: path.to_path_buf(),
                version,
            });
        }
        let blob_count = u32::from_be_bytes(fixed[24..28].try_into().unwrap());
        let segment_size = u32::from_be_bytes(fixed[28..32].try_into().unwrap());

        if HEADER_LENGTH + u64::from(blob_count) * 4 > file_len {
            // The declared index table cannot fit in the file.
            return Err(io_err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("slot index table of {blob_count} entries exceeds file size"),
            )));
        }

        let mut slot_index = Vec::with_capacity(blob_count as usize);
        for _ in 0..blob_count {
            slot_index.push(file.read_u32::<BigEndian>().map_err(io_err)?);
        }

        log::debug!(
            "{}: version {version}, {blob_count} slots, segment size {segment_size}",
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            file_len,
            header: StorageHeader {
                version,
                blob_count,
                segment_size,
            },
            slot_index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> StorageHeader {
        self.header
    }

    pub fn slot_count(&self) -> usize {
        self.slot_index.len()
    }

    pub fn is_empty_slot(&self, slot: usize) -> bool {
        self.slot_index.get(slot).is_none_or(|&s| s == 0)
    }

    /// Slots that hold a payload, in ascending order.
    pub fn nonempty_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slot_index
            .iter()
            .enumerate()
            .filter(|(_, &s)| s != 0)
            .map(|(i, _)| i)
    }

    /// File position where the segment area starts.
    fn segments_base(&self) -> u64 {
        HEADER_LENGTH + u64::from(self.header.blob_count) * 4
    }

    /// Producer mapping from a non-zero slot-index value to a file offset.
    fn segment_position(&self, segment: u32) -> u64 {
        self.segments_base() + u64::from(segment - 1) * u64::from(self.header.segment_size)
    }

    /// Read the compressed payload for a slot; `None` when the slot is empty.
    pub fn slot_payload(&mut self, slot: usize) -> Result<Option<Blob>, RegionError> {
        let Some(&segment) = self.slot_index.get(slot) else {
            return Ok(None);
        };
        if segment == 0 {
            return Ok(None);
        }

        let bad_pointer = || RegionError::BadSegmentPointer {
            path: self.path.clone(),
            slot,
            segment,
        };
        let pos = self.segment_position(segment);
        if pos + 8 > self.file_len {
            return Err(bad_pointer());
        }

        let io_err = |source| RegionError::Io {
            path: self.path.clone(),
            source,
        };
        self.file.seek(SeekFrom::Start(pos)).map_err(io_err)?;
        let source_length = self.file.read_u32::<BigEndian>().map_err(io_err)?;
        let compressed_length = self.file.read_u32::<BigEndian>().map_err(io_err)?;

        if pos + 8 + u64::from(compressed_length) > self.file_len {
            return Err(bad_pointer());
        }

        let mut data = vec![0u8; compressed_length as usize];
        self.file.read_exact(&mut data).map_err(io_err)?;
        Ok(Some(Blob {
            source_length,
            data,
        }))
    }

    /// Non-empty slots paired with their compressed payloads, ascending.
    pub fn iter_nonempty_slots(
        &mut self,
    ) -> impl Iterator<Item = (usize, Result<Blob, RegionError>)> + '_ {
        let slots: Vec<usize> = self.nonempty_slots().collect();
        slots
            .into_iter()
            .filter_map(move |slot| match self.slot_payload(slot) {
                Ok(Some(blob)) => Some((slot, Ok(blob))),
                Ok(None) => None,
                Err(e) => Some((slot, Err(e))),
            })
    }
}
