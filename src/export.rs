//! JSON serialization of parsed region data.
//!
//! Block positions are keyed `"x,y,z"` in world coordinates (signed decimal,
//! no spaces) and map to `{name, components}` records. A key is written for
//! every voxel whose palette name is not the default air name and for every
//! position carrying a block component. Key order carries no meaning.

use serde_json::{json, Map, Number, Value as JsonValue};

use crate::bson::{Document, Value};
use crate::chunk::{delinearize, ParsedChunk};
use crate::error::RegionError;
use crate::region::{RegionReader, RegionSummary};

/// Palette name the producer uses for air voxels; skipped in block exports.
pub const DEFAULT_BLOCK_NAME: &str = "Empty";

/// Convert one document node to JSON.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Double(d) => {
            JsonValue::Number(Number::from_f64(*d).unwrap_or_else(|| Number::from(0)))
        }
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Document(d) => document_to_json(d),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Binary { subtype, data } => json!({
            "subtype": subtype,
            "data": to_hex(data),
        }),
        Value::ObjectId(id) => JsonValue::String(to_hex(id)),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::DateTime(ms) => JsonValue::Number((*ms).into()),
        Value::Null => JsonValue::Null,
        Value::Int32(v) => JsonValue::Number((*v).into()),
        Value::Timestamp(v) => JsonValue::Number((*v).into()),
        Value::Int64(v) => JsonValue::Number((*v).into()),
    }
}

/// Convert a document tree to a JSON object.
pub fn document_to_json(doc: &Document) -> JsonValue {
    let mut map = Map::new();
    for (key, value) in doc.iter() {
        map.insert(key.to_owned(), value_to_json(value));
    }
    JsonValue::Object(map)
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn container_to_json(container: &crate::chunk::ItemContainer) -> JsonValue {
    let (x, y, z) = container.world_position;
    json!({
        "position": [x, y, z],
        "capacity": container.capacity,
        "items": container.items.iter().map(value_to_json).collect::<Vec<_>>(),
        "custom_name": container.custom_name,
        "allow_viewing": container.allow_viewing,
    })
}

/// Merge one chunk's voxels and components into the `blocks` map.
fn add_chunk_blocks(chunk: &ParsedChunk, blocks: &mut Map<String, JsonValue>, include_terrain: bool) {
    if include_terrain {
        for (section_index, section) in chunk.sections.iter().enumerate() {
            for (linear, entry) in section.voxels() {
                if entry.name == DEFAULT_BLOCK_NAME {
                    continue;
                }
                let (x, y, z) = delinearize(linear);
                let (wx, wy, wz) = chunk.world_position(section_index, x, y, z);
                blocks.insert(
                    format!("{wx},{wy},{wz}"),
                    json!({ "name": entry.name, "components": JsonValue::Null }),
                );
            }
        }
    }

    for component in &chunk.block_components {
        let (x, y, z) = component.local_position();
        let (wx, wy, wz) = chunk.world_position(
            component.section_index as usize,
            x as usize,
            y as usize,
            z as usize,
        );
        let name = chunk
            .block_name_at(component.section_index as usize, x as usize, y as usize, z as usize)
            .map_or(JsonValue::Null, |n| JsonValue::String(n.to_owned()));
        blocks.insert(
            format!("{wx},{wy},{wz}"),
            json!({ "name": name, "components": document_to_json(&component.components) }),
        );
    }
}

/// Serialize a whole region file.
///
/// Per-chunk failures follow the reader's failure mode: in lenient mode they
/// are logged and tallied, in strict mode the first one is returned.
pub fn export_region(
    reader: &mut RegionReader,
    include_terrain: bool,
) -> Result<JsonValue, RegionError> {
    let region = reader.region_pos();
    let lenient = reader.mode() == crate::region::FailureMode::Lenient;
    let mut blocks = Map::new();
    let mut containers = Vec::new();
    let mut block_summary: std::collections::BTreeMap<String, u64> = Default::default();
    let mut chunk_count = 0usize;
    let mut failed_chunks = 0usize;

    for result in reader.by_ref() {
        match result {
            Ok(chunk) => {
                chunk_count += 1;
                for section in &chunk.sections {
                    for (name, count) in &section.block_counts {
                        *block_summary.entry(name.clone()).or_insert(0) += u64::from(*count);
                    }
                }
                containers.extend(chunk.containers.iter().map(container_to_json));
                add_chunk_blocks(&chunk, &mut blocks, include_terrain);
            }
            Err(e) if lenient && !e.is_file_fatal() => {
                log::warn!("{e}");
                failed_chunks += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(json!({
        "metadata": {
            "region_x": region.x,
            "region_z": region.z,
            "chunk_count": chunk_count,
            "failed_chunks": failed_chunks,
            "block_summary": block_summary,
        },
        "blocks": JsonValue::Object(blocks),
        "containers": containers,
    }))
}

/// Serialize a block-count summary (the `--summary-only` shape).
pub fn export_summary(summary: &RegionSummary) -> JsonValue {
    json!({
        "metadata": {
            "region_x": summary.region_x,
            "region_z": summary.region_z,
            "chunk_count": summary.chunk_count,
            "failed_chunks": summary.failed_chunks,
        },
        "block_summary": summary.block_counts,
        "container_count": summary.container_count,
    })
}
