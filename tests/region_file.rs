//! End-to-end tests driving the full decoder stack over synthetic region
//! files: dialect-encoded chunk documents, Zstandard-framed blobs, and the
//! IndexedStorage container layout, written to disk and read back.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use hytale_region_parser::bson::{Document, Value};
use hytale_region_parser::export::export_region;
use hytale_region_parser::{FailureMode, RegionError, RegionReader};

const MAGIC: &[u8; 20] = b"HytaleIndexedStorage";
const BLOB_COUNT: u32 = 1024;
const SECTION_VOLUME: usize = 32 * 32 * 32;

fn doc(entries: Vec<(&str, Value)>) -> Document {
    let mut d = Document::new();
    for (k, v) in entries {
        d.insert(k, v);
    }
    d
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02X}");
        s
    })
}

/// Hex payload for one section: migration version, palette, index array.
fn section_payload(palette_type: u8, entries: &[(u8, &str, i16)], indices: &[u8]) -> String {
    let mut bytes = 1u32.to_be_bytes().to_vec();
    bytes.push(palette_type);
    bytes.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (id, name, count) in entries {
        bytes.push(*id);
        bytes.extend_from_slice(&(name.len() as u16).to_be_bytes());
        bytes.extend_from_slice(name.as_bytes());
        bytes.extend_from_slice(&count.to_be_bytes());
    }
    bytes.extend_from_slice(indices);
    to_hex(&bytes)
}

/// Root chunk document with the producer's component layout.
fn chunk_document(section_payloads: Vec<Option<String>>, block_components: Vec<(u32, Value)>) -> Document {
    let sections: Vec<Value> = section_payloads
        .into_iter()
        .map(|payload| {
            let block = match payload {
                Some(hex) => doc(vec![("Data", Value::String(hex))]),
                None => Document::new(),
            };
            Value::Document(doc(vec![(
                "Components",
                Value::Document(doc(vec![("Block", Value::Document(block))])),
            )]))
        })
        .collect();

    let mut components = doc(vec![(
        "ChunkColumn",
        Value::Document(doc(vec![("Sections", Value::Array(sections))])),
    )]);
    if !block_components.is_empty() {
        let mut keyed = Document::new();
        for (packed, tree) in block_components {
            keyed.insert(packed.to_string(), tree);
        }
        components.insert(
            "BlockComponentChunk",
            Value::Document(doc(vec![("BlockComponents", Value::Document(keyed))])),
        );
    }

    doc(vec![
        ("Version", Value::Int32(6)),
        ("Components", Value::Document(components)),
    ])
}

/// Frame raw chunk payloads into a complete IndexedStorage file.
///
/// `declared_len` overrides the blob header's decompressed length when given
/// (to provoke size-mismatch failures).
fn build_region_file(slots: &[(usize, Vec<u8>, Option<u32>)], segment_size: u32) -> Vec<u8> {
    let mut header = MAGIC.to_vec();
    header.extend_from_slice(&1u32.to_be_bytes());
    header.extend_from_slice(&BLOB_COUNT.to_be_bytes());
    header.extend_from_slice(&segment_size.to_be_bytes());

    let mut index = vec![0u32; BLOB_COUNT as usize];
    let mut segment_area = Vec::new();
    let mut next_segment = 1u32;

    for (slot, raw, declared_len) in slots {
        let compressed = zstd::encode_all(&raw[..], 0).unwrap();
        let mut blob = declared_len
            .unwrap_or(raw.len() as u32)
            .to_be_bytes()
            .to_vec();
        blob.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
        blob.extend_from_slice(&compressed);

        index[*slot] = next_segment;
        let offset = (next_segment - 1) as usize * segment_size as usize;
        if segment_area.len() < offset + blob.len() {
            segment_area.resize(offset + blob.len(), 0);
        }
        segment_area[offset..offset + blob.len()].copy_from_slice(&blob);
        next_segment += blob.len().div_ceil(segment_size as usize) as u32;
    }

    let mut bytes = header;
    for entry in index {
        bytes.extend_from_slice(&entry.to_be_bytes());
    }
    bytes.extend_from_slice(&segment_area);
    bytes
}

fn write_region(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn empty_region_yields_no_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_region(&dir, "3.-7.region.bin", &build_region_file(&[], 4096));

    let mut reader = RegionReader::open(&path).unwrap();
    assert_eq!(reader.region_pos().x, 3);
    assert_eq!(reader.region_pos().z, -7);
    assert_eq!(reader.chunk_count(), 0);

    let summary = reader.summarize().unwrap();
    assert_eq!(summary.chunk_count, 0);
    assert_eq!(summary.unique_blocks(), 0);
    assert_eq!(reader.count(), 0);
}

#[test]
fn single_stone_chunk_decodes_fully() {
    let payload = section_payload(2, &[(1, "Rock_Stone", 32767)], &[0u8; SECTION_VOLUME]);
    let root = chunk_document(vec![Some(payload)], vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_region(
        &dir,
        "0.0.region.bin",
        &build_region_file(&[(0, root.encode(), None)], 4096),
    );

    let mut reader = RegionReader::open(&path).unwrap();
    let chunks: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(chunks.len(), 1);

    let chunk = &chunks[0];
    assert_eq!((chunk.chunk_x, chunk.chunk_z), (0, 0));
    assert_eq!(chunk.version, 6);
    assert_eq!(chunk.sections.len(), 1);
    assert_eq!(chunk.sections[0].block_counts["Rock_Stone"], 32768);
    assert_eq!(chunk.world_position(0, 0, 0, 0), (0, 0, 0));
    assert_eq!(chunk.block_name_at(0, 0, 0, 0), Some("Rock_Stone"));
    assert!(chunk.block_names.contains("Rock_Stone"));

    let summary = reader.summarize().unwrap();
    assert_eq!(summary.chunk_count, 1);
    assert_eq!(summary.block_counts["Rock_Stone"], 32768);
}

#[test]
fn summary_matches_per_chunk_histograms() {
    let stone = section_payload(2, &[(1, "Rock_Stone", 0)], &[0u8; SECTION_VOLUME]);
    let mut mixed_indices = vec![0u8; SECTION_VOLUME];
    mixed_indices[..500].fill(1);
    let mixed = section_payload(
        2,
        &[(1, "Rock_Stone", 0), (2, "Ore_Copper", 0)],
        &mixed_indices,
    );

    let chunk_a = chunk_document(vec![Some(stone)], vec![]);
    let chunk_b = chunk_document(vec![None, Some(mixed)], vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_region(
        &dir,
        "0.0.region.bin",
        &build_region_file(
            &[(0, chunk_a.encode(), None), (33, chunk_b.encode(), None)],
            4096,
        ),
    );

    let mut reader = RegionReader::open(&path).unwrap();
    let mut expected: std::collections::BTreeMap<String, u64> = Default::default();
    for chunk in reader.by_ref() {
        for section in &chunk.unwrap().sections {
            for (name, count) in &section.block_counts {
                *expected.entry(name.clone()).or_insert(0) += u64::from(*count);
            }
        }
    }

    let summary = reader.summarize().unwrap();
    assert_eq!(summary.block_counts, expected);
    assert_eq!(summary.block_counts["Ore_Copper"], 500);
    assert_eq!(
        summary.block_counts["Rock_Stone"],
        2 * SECTION_VOLUME as u64 - 500
    );
    // Chunk 33 is local (1, 1) -> world chunk (1, 1).
    assert_eq!(summary.chunk_count, 2);
}

#[test]
fn lenient_mode_reports_failure_and_continues() {
    // Slot 4: Short-type section whose index array references entry 300 of a
    // 300-entry palette. Slot 10 is fine.
    let entries: Vec<(u8, String, i16)> = (0..300).map(|i| (i as u8, format!("Block_{i:03}"), 0)).collect();
    let entry_refs: Vec<(u8, &str, i16)> = entries
        .iter()
        .map(|(id, name, count)| (*id, name.as_str(), *count))
        .collect();
    let mut bad_indices = vec![0u8; SECTION_VOLUME * 2];
    bad_indices[0..2].copy_from_slice(&300u16.to_be_bytes());
    let bad = chunk_document(
        vec![Some(section_payload(3, &entry_refs, &bad_indices))],
        vec![],
    );
    let good = chunk_document(
        vec![Some(section_payload(
            2,
            &[(1, "Soil_Dirt", 0)],
            &[0u8; SECTION_VOLUME],
        ))],
        vec![],
    );

    let dir = tempfile::tempdir().unwrap();
    let bytes = build_region_file(
        &[(4, bad.encode(), None), (10, good.encode(), None)],
        4096,
    );
    let path = write_region(&dir, "0.0.region.bin", &bytes);

    // Lenient: the failure is reported in-stream and iteration continues.
    let reader = RegionReader::open(&path).unwrap().with_mode(FailureMode::Lenient);
    let results: Vec<_> = reader.collect();
    assert_eq!(results.len(), 2);
    match &results[0] {
        Err(RegionError::Chunk { slot: 4, .. }) => {}
        other => panic!("expected slot 4 failure, got {other:?}"),
    }
    let chunk = results[1].as_ref().unwrap();
    assert_eq!(chunk.sections[0].block_counts["Soil_Dirt"], 32768);

    // Strict: the first error fuses the iterator.
    let mut reader = RegionReader::open(&path).unwrap();
    assert!(matches!(
        reader.next(),
        Some(Err(RegionError::Chunk { slot: 4, .. }))
    ));
    assert!(reader.next().is_none());

    // A lenient summary tallies the failure instead of aborting.
    let mut reader = RegionReader::open(&path).unwrap().with_mode(FailureMode::Lenient);
    let summary = reader.summarize().unwrap();
    assert_eq!(summary.chunk_count, 1);
    assert_eq!(summary.failed_chunks, 1);
}

#[test]
fn blob_length_mismatch_is_a_chunk_error() {
    let root = chunk_document(vec![], vec![]);
    let raw = root.encode();
    let declared = raw.len() as u32 + 9;
    let dir = tempfile::tempdir().unwrap();
    let path = write_region(
        &dir,
        "0.0.region.bin",
        &build_region_file(&[(0, raw, Some(declared))], 4096),
    );

    let mut reader = RegionReader::open(&path).unwrap();
    match reader.next() {
        Some(Err(RegionError::Chunk { slot: 0, source, .. })) => {
            let text = source.to_string();
            assert!(text.contains("declared"), "unexpected error: {text}");
        }
        other => panic!("expected chunk error, got {other:?}"),
    }
}

#[test]
fn container_positions_survive_the_full_stack() {
    // A chest at packed key 65 (section 0, local (1, 0, 2)) in slot 66,
    // which is local chunk (2, 2).
    let item = Value::Document(doc(vec![
        ("Id", Value::String("Ore_Copper".into())),
        ("Quantity", Value::Int32(4)),
    ]));
    let container = Value::Document(doc(vec![(
        "Components",
        Value::Document(doc(vec![(
            "container",
            Value::Document(doc(vec![
                ("capacity", Value::Int32(18)),
                ("items", Value::Array(vec![item])),
                ("allow_viewing", Value::Bool(true)),
            ])),
        )])),
    )]));
    let root = chunk_document(vec![], vec![(65, container)]);

    let dir = tempfile::tempdir().unwrap();
    let path = write_region(
        &dir,
        "-1.0.region.bin",
        &build_region_file(&[(66, root.encode(), None)], 4096),
    );

    let chunks: Vec<_> = RegionReader::open(&path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let chunk = &chunks[0];
    // Region -1, local (2, 2) -> world chunk (-30, 2).
    assert_eq!((chunk.chunk_x, chunk.chunk_z), (-30, 2));

    let container = &chunk.containers[0];
    assert_eq!(container.world_position, (-30 * 32 + 1, 0, 2 * 32 + 2));
    assert_eq!(container.capacity, 18);
    assert_eq!(container.items.len(), 1);
    assert_eq!(container.allow_viewing, Some(true));
    assert_eq!(
        container.items[0].as_document().unwrap().get_str("Id"),
        Some("Ore_Copper")
    );
}

#[test]
fn export_skips_default_blocks_and_keys_by_world_position() {
    // Entry 0 is air ("Empty"); exactly one voxel is ore.
    let mut indices = vec![0u8; SECTION_VOLUME];
    indices[0] = 1; // local (0, 0, 0)
    let payload = section_payload(2, &[(0, "Empty", 0), (1, "Ore_Iron", 0)], &indices);
    let root = chunk_document(vec![Some(payload)], vec![]);

    let dir = tempfile::tempdir().unwrap();
    let path = write_region(
        &dir,
        "0.0.region.bin",
        &build_region_file(&[(33, root.encode(), None)], 4096),
    );

    let mut reader = RegionReader::open(&path).unwrap();
    let data = export_region(&mut reader, true).unwrap();

    let blocks = data["blocks"].as_object().unwrap();
    // Slot 33 -> local chunk (1, 1) -> the ore voxel sits at world (32, 0, 32).
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks["32,0,32"]["name"], "Ore_Iron");
    assert_eq!(data["metadata"]["chunk_count"], 1);
    assert_eq!(data["metadata"]["block_summary"]["Ore_Iron"], 1);
    assert_eq!(
        data["metadata"]["block_summary"]["Empty"],
        SECTION_VOLUME as u64 - 1
    );
}
