//! Hytale region file format (.region.bin).
//!
//! A region file packs 32x32 chunks in the IndexedStorage layout:
//! - Bytes 0-31: header (magic, version, blob count, segment size)
//! - Bytes 32+: slot index table (`blob_count` entries x 4 bytes)
//! - After the table: segment area holding the compressed blobs

mod reader;
mod storage;

pub use reader::{FailureMode, RegionReader, RegionSummary};
pub use storage::{Blob, IndexedStorageReader, StorageHeader};

/// Chunks per region edge; the slot index table is this grid flattened.
pub const REGION_SIZE: i32 = 32;

/// Slots in a region file's index table (the 32x32 chunk grid).
pub const REGION_SLOTS: usize = 1024;

/// Which region file holds a world chunk coordinate.
#[inline]
pub fn region_of_chunk(chunk_coord: i32) -> i32 {
    chunk_coord.div_euclid(REGION_SIZE)
}

/// Where a world chunk coordinate sits inside its region's grid (0-31).
#[inline]
pub fn local_of_chunk(chunk_coord: i32) -> i32 {
    chunk_coord.rem_euclid(REGION_SIZE)
}

/// Slot index covering a grid position; slots run x-fastest, so slot
/// `i` holds the chunk at `(i % 32, i / 32)`.
#[inline]
pub fn slot_of_local(local_x: i32, local_z: i32) -> usize {
    (local_z * REGION_SIZE + local_x) as usize
}

/// Grid position stored at a slot index.
#[inline]
pub fn slot_to_local(slot: usize) -> (i32, i32) {
    (
        (slot % REGION_SIZE as usize) as i32,
        (slot / REGION_SIZE as usize) as i32,
    )
}

/// Coordinates of one region file, taken from its `<x>.<z>.region.bin` name.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    /// Parse a region file name, e.g. "-2.-3.region.bin". Both coordinates
    /// are signed decimals.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() == 4 && parts[2] == "region" && parts[3] == "bin" {
            let x = parts[0].parse().ok()?;
            let z = parts[1].parse().ok()?;
            Some(Self { x, z })
        } else {
            None
        }
    }

    /// World chunk coordinates of the chunk stored in `slot`.
    pub fn chunk_at_slot(&self, slot: usize) -> (i32, i32) {
        let (local_x, local_z) = slot_to_local(slot);
        (
            self.x * REGION_SIZE + local_x,
            self.z * REGION_SIZE + local_z,
        )
    }
}
