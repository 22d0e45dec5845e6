//! Lazy iteration over the chunks of one region file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::bson::Document;
use crate::chunk::{assemble_chunk, ParsedChunk};
use crate::compress;
use crate::error::RegionError;

use super::storage::IndexedStorageReader;
use super::RegionPos;

/// What to do when one slot fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Surface the first error and stop iterating.
    #[default]
    Strict,
    /// Yield the error for the failed slot and keep going. File-level
    /// faults (bad segment pointers, IO) still stop iteration.
    Lenient,
}

/// Pull-based cursor yielding one [`ParsedChunk`] per non-empty slot, in
/// ascending slot order.
///
/// The reader owns the file handle; dropping it releases everything. Each
/// yielded chunk owns its own buffers and may outlive the reader.
pub struct RegionReader {
    storage: IndexedStorageReader,
    region: RegionPos,
    mode: FailureMode,
    next_slot: usize,
    fused: bool,
}

impl RegionReader {
    /// Open a region file; coordinates come from the file name.
    pub fn open(path: &Path) -> Result<Self, RegionError> {
        let region = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(RegionPos::from_file_name)
            .ok_or_else(|| RegionError::BadFileName {
                path: path.to_path_buf(),
            })?;
        let storage = IndexedStorageReader::open(path)?;
        Ok(Self {
            storage,
            region,
            mode: FailureMode::default(),
            next_slot: 0,
            fused: false,
        })
    }

    pub fn with_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> FailureMode {
        self.mode
    }

    /// Region coordinates parsed from the file name.
    pub fn region_pos(&self) -> RegionPos {
        self.region
    }

    pub fn storage(&self) -> &IndexedStorageReader {
        &self.storage
    }

    /// Number of slots that hold a payload.
    pub fn chunk_count(&self) -> usize {
        self.storage.nonempty_slots().count()
    }

    fn decode_slot(&mut self, slot: usize) -> Result<Option<ParsedChunk>, RegionError> {
        let Some(blob) = self.storage.slot_payload(slot)? else {
            return Ok(None);
        };
        let chunk_err = |source| RegionError::Chunk {
            path: self.storage.path().to_path_buf(),
            slot,
            source,
        };
        let raw = compress::decompress(&blob.data, blob.source_length as usize)
            .map_err(chunk_err)?;
        let root = Document::parse(&raw).map_err(chunk_err)?;
        let (chunk_x, chunk_z) = self.region.chunk_at_slot(slot);
        assemble_chunk(root, chunk_x, chunk_z)
            .map(Some)
            .map_err(chunk_err)
    }

    /// Aggregate block-name counts across the whole file without retaining
    /// per-section data. Runs its own pass over the slots.
    pub fn summarize(&mut self) -> Result<RegionSummary, RegionError> {
        let mut summary = RegionSummary {
            region_x: self.region.x,
            region_z: self.region.z,
            chunk_count: 0,
            failed_chunks: 0,
            container_count: 0,
            block_counts: BTreeMap::new(),
        };

        for slot in 0..self.storage.slot_count() {
            if self.storage.is_empty_slot(slot) {
                continue;
            }
            match self.decode_slot(slot) {
                Ok(None) => {}
                Ok(Some(chunk)) => {
                    summary.chunk_count += 1;
                    summary.container_count += chunk.containers.len();
                    for section in &chunk.sections {
                        for (name, count) in &section.block_counts {
                            *summary.block_counts.entry(name.clone()).or_insert(0) +=
                                u64::from(*count);
                        }
                    }
                }
                Err(e) if self.mode == FailureMode::Lenient && !e.is_file_fatal() => {
                    log::warn!("{e}");
                    summary.failed_chunks += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }
}

impl Iterator for RegionReader {
    type Item = Result<ParsedChunk, RegionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        while self.next_slot < self.storage.slot_count() {
            let slot = self.next_slot;
            self.next_slot += 1;
            if self.storage.is_empty_slot(slot) {
                continue;
            }
            match self.decode_slot(slot) {
                Ok(Some(chunk)) => return Some(Ok(chunk)),
                Ok(None) => {}
                Err(e) => {
                    if self.mode == FailureMode::Strict || e.is_file_fatal() {
                        self.fused = true;
                    }
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Region-level aggregate of block-name counts.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSummary {
    pub region_x: i32,
    pub region_z: i32,
    /// Slots that decoded successfully.
    pub chunk_count: usize,
    /// Slots skipped in lenient mode.
    pub failed_chunks: usize,
    pub container_count: usize,
    /// Total voxels per block name across every section of every chunk.
    pub block_counts: BTreeMap<String, u64>,
}

impl RegionSummary {
    /// Number of distinct block names seen.
    pub fn unique_blocks(&self) -> usize {
        self.block_counts.len()
    }
}
