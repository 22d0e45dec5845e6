//! Chunk assembly from a decoded document tree.
//!
//! The producer's root document for one slot looks like:
//!
//! ```text
//! { Version: int,
//!   Components: {
//!     ChunkColumn: { Sections: [ { Components: { Block: { Data: "<hex>" } } }, ... ] },
//!     BlockComponentChunk: { BlockComponents: { "<packed index>": {...}, ... } },
//!     EntityChunk: { Entities: [ ... ] } } }
//! ```
//!
//! Packed block-component keys split as `section = key / 32768` and
//! `position = key % 32768`.

use std::collections::BTreeSet;

use crate::bson::{Document, Value};
use crate::error::DecodeError;

use super::section::{decode_section, delinearize};
use super::{BlockComponent, ChunkSection, ItemContainer, ParsedChunk, SECTION_LENGTH, SECTION_VOLUME};

/// Build a [`ParsedChunk`] for the chunk at world chunk coordinates
/// `(chunk_x, chunk_z)` from its decoded root document.
pub fn assemble_chunk(
    root: Document,
    chunk_x: i32,
    chunk_z: i32,
) -> Result<ParsedChunk, DecodeError> {
    let version = root.get_i64("Version").unwrap_or(0);
    let components = match root.get("Components") {
        None => None,
        Some(Value::Document(d)) => Some(d),
        Some(_) => {
            return Err(DecodeError::UnexpectedShape {
                path: "Components",
                expected: "document",
            })
        }
    };

    let mut sections = Vec::new();
    let mut block_components = Vec::new();
    let mut containers = Vec::new();
    let mut entities = Vec::new();

    if let Some(components) = components {
        sections = decode_sections(components)?;
        extract_block_components(
            components,
            chunk_x,
            chunk_z,
            &mut block_components,
            &mut containers,
        )?;
        if let Some(chunk) = components.get_document("EntityChunk") {
            match chunk.get("Entities") {
                None | Some(Value::Null) => {}
                Some(Value::Array(list)) => entities = list.clone(),
                Some(_) => {
                    return Err(DecodeError::UnexpectedShape {
                        path: "Components.EntityChunk.Entities",
                        expected: "array",
                    })
                }
            }
        }
    }

    let block_names: BTreeSet<String> = sections
        .iter()
        .flat_map(|s| s.palette.iter().map(|e| e.name.clone()))
        .collect();

    Ok(ParsedChunk {
        chunk_x,
        chunk_z,
        version,
        sections,
        block_components,
        containers,
        entities,
        block_names,
        raw_components: root,
    })
}

fn decode_sections(components: &Document) -> Result<Vec<ChunkSection>, DecodeError> {
    let Some(column) = components.get_document("ChunkColumn") else {
        return Ok(Vec::new());
    };
    let elements = match column.get("Sections") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(list)) => list,
        Some(_) => {
            return Err(DecodeError::UnexpectedShape {
                path: "Components.ChunkColumn.Sections",
                expected: "array",
            })
        }
    };

    let mut sections = Vec::with_capacity(elements.len());
    for (section_y, element) in elements.iter().enumerate() {
        let payload = element
            .as_document()
            .and_then(|d| d.get_document("Components"))
            .and_then(|d| d.get_document("Block"))
            .and_then(|d| d.get("Data"));
        let section = match payload {
            None | Some(Value::Null) => ChunkSection::empty(section_y as u8),
            Some(Value::String(hex)) => decode_section(hex, section_y as u8)?,
            Some(_) => {
                return Err(DecodeError::UnexpectedShape {
                    path: "Components.ChunkColumn.Sections[].Components.Block.Data",
                    expected: "hex string",
                })
            }
        };
        sections.push(section);
    }
    Ok(sections)
}

fn extract_block_components(
    components: &Document,
    chunk_x: i32,
    chunk_z: i32,
    block_components: &mut Vec<BlockComponent>,
    containers: &mut Vec<ItemContainer>,
) -> Result<(), DecodeError> {
    let Some(component_chunk) = components.get_document("BlockComponentChunk") else {
        return Ok(());
    };
    let entries = match component_chunk.get("BlockComponents") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Document(d)) => d,
        Some(_) => {
            return Err(DecodeError::UnexpectedShape {
                path: "Components.BlockComponentChunk.BlockComponents",
                expected: "document",
            })
        }
    };

    for (key, value) in entries.iter() {
        let Ok(packed) = key.parse::<u32>() else {
            log::debug!("skipping block component with non-numeric key {key:?}");
            continue;
        };
        let Some(tree) = value.as_document() else {
            log::debug!("skipping block component {packed} with non-document payload");
            continue;
        };

        let section_index = (packed / SECTION_VOLUME as u32) as u8;
        let position_in_section = (packed % SECTION_VOLUME as u32) as u16;

        if let Some(container) = find_container(tree) {
            let (x, y, z) = delinearize(position_in_section as usize);
            containers.push(ItemContainer {
                world_position: (
                    chunk_x * SECTION_LENGTH as i32 + x as i32,
                    i32::from(section_index) * SECTION_LENGTH as i32 + y as i32,
                    chunk_z * SECTION_LENGTH as i32 + z as i32,
                ),
                capacity: container.get_i64("capacity").unwrap_or(0).max(0) as u32,
                items: container_items(container),
                custom_name: container
                    .get("custom_name")
                    .filter(|v| !v.is_null())
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                allow_viewing: container.get("allow_viewing").and_then(Value::as_bool),
            });
        }

        block_components.push(BlockComponent {
            packed_index: packed,
            section_index,
            position_in_section,
            components: tree.clone(),
        });
    }
    Ok(())
}

/// The container subdocument sits either directly on the component tree or
/// under the tree's inner `Components` document.
fn find_container(tree: &Document) -> Option<&Document> {
    tree.get_document("container").or_else(|| {
        tree.get_document("Components")
            .and_then(|inner| inner.get_document("container"))
    })
}

/// Items may be an array or a document keyed by slot; either way the records
/// pass through untouched, in order.
fn container_items(container: &Document) -> Vec<Value> {
    match container.get("items") {
        Some(Value::Array(list)) => list.clone(),
        Some(Value::Document(slots)) => slots.iter().map(|(_, v)| v.clone()).collect(),
        _ => Vec::new(),
    }
}
