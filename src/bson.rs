//! Hytale's binary document dialect.
//!
//! Chunk payloads decompress into a BSON-shaped document: a 4-byte
//! little-endian total size, a run of `(type tag, cstring key, value)`
//! entries, and a 0x00 terminator. Arrays are documents whose keys are the
//! decimal strings "0", "1", ... in order. The size prefix must match the
//! bytes consumed exactly.

use crate::cursor::ByteCursor;
use crate::error::DecodeError;

/// Type tags used by the dialect.
mod tag {
    pub const END: u8 = 0x00;
    pub const DOUBLE: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const DOCUMENT: u8 = 0x03;
    pub const ARRAY: u8 = 0x04;
    pub const BINARY: u8 = 0x05;
    pub const OBJECT_ID: u8 = 0x07;
    pub const BOOL: u8 = 0x08;
    pub const DATETIME: u8 = 0x09;
    pub const NULL: u8 = 0x0A;
    pub const INT32: u8 = 0x10;
    pub const TIMESTAMP: u8 = 0x11;
    pub const INT64: u8 = 0x12;
}

/// One node of a decoded document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    String(String),
    Document(Document),
    Array(Vec<Value>),
    Binary { subtype: u8, data: Vec<u8> },
    ObjectId([u8; 12]),
    Bool(bool),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Null,
    Int32(i32),
    Timestamp(i64),
    Int64(i64),
}

impl Value {
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn tag(&self) -> u8 {
        match self {
            Value::Double(_) => tag::DOUBLE,
            Value::String(_) => tag::STRING,
            Value::Document(_) => tag::DOCUMENT,
            Value::Array(_) => tag::ARRAY,
            Value::Binary { .. } => tag::BINARY,
            Value::ObjectId(_) => tag::OBJECT_ID,
            Value::Bool(_) => tag::BOOL,
            Value::DateTime(_) => tag::DATETIME,
            Value::Null => tag::NULL,
            Value::Int32(_) => tag::INT32,
            Value::Timestamp(_) => tag::TIMESTAMP,
            Value::Int64(_) => tag::INT64,
        }
    }
}

/// An insertion-ordered map of string keys to [`Value`] nodes.
///
/// Keys are unique; inserting an existing key replaces its value in place.
/// Iteration order is the order entries appeared in the source bytes, which
/// makes enumeration deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_document)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse a root document from raw bytes.
    ///
    /// Bytes past the declared root size are ignored; the producer pads
    /// nothing in practice, but the bound is the size prefix, not the slice.
    pub fn parse(data: &[u8]) -> Result<Document, DecodeError> {
        let mut cur = ByteCursor::new(data);
        parse_document(&mut cur)
    }

    /// Re-encode the tree with the dialect rules, size prefix included.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_document(self, &mut out);
        out
    }
}

fn parse_document(cur: &mut ByteCursor) -> Result<Document, DecodeError> {
    let start = cur.position();
    let declared = cur.read_i32_le()?;
    if declared < 5 {
        return Err(DecodeError::DocumentSizeMismatch {
            declared: declared.max(0) as usize,
            consumed: 4,
        });
    }
    let declared = declared as usize;

    let mut doc = Document::new();
    loop {
        let tag_at = cur.position();
        let element_tag = cur.read_u8()?;
        if element_tag == tag::END {
            break;
        }
        let key = cur.read_cstring()?;
        let value = parse_value(cur, element_tag, tag_at)?;
        doc.entries.push((key, value));
    }

    let consumed = cur.position() - start;
    if consumed != declared {
        return Err(DecodeError::DocumentSizeMismatch { declared, consumed });
    }
    Ok(doc)
}

fn parse_array(cur: &mut ByteCursor) -> Result<Vec<Value>, DecodeError> {
    // Array keys are decimal indices; the order that matters is insertion
    // order, so the keys themselves are dropped here.
    let doc = parse_document(cur)?;
    Ok(doc.entries.into_iter().map(|(_, v)| v).collect())
}

fn parse_value(cur: &mut ByteCursor, element_tag: u8, tag_at: usize) -> Result<Value, DecodeError> {
    match element_tag {
        tag::DOUBLE => Ok(Value::Double(cur.read_f64_le()?)),
        tag::STRING => Ok(Value::String(cur.read_string_i32_le()?)),
        tag::DOCUMENT => Ok(Value::Document(parse_document(cur)?)),
        tag::ARRAY => Ok(Value::Array(parse_array(cur)?)),
        tag::BINARY => {
            let at = cur.position();
            let length = cur.read_i32_le()?;
            if length < 0 {
                return Err(DecodeError::InvalidStringLength { length, offset: at });
            }
            let subtype = cur.read_u8()?;
            let data = cur.read_bytes(length as usize)?.to_vec();
            Ok(Value::Binary { subtype, data })
        }
        tag::OBJECT_ID => {
            let bytes = cur.read_bytes(12)?;
            let mut id = [0u8; 12];
            id.copy_from_slice(bytes);
            Ok(Value::ObjectId(id))
        }
        tag::BOOL => Ok(Value::Bool(cur.read_u8()? != 0)),
        tag::DATETIME => Ok(Value::DateTime(cur.read_i64_le()?)),
        tag::NULL => Ok(Value::Null),
        tag::INT32 => Ok(Value::Int32(cur.read_i32_le()?)),
        tag::TIMESTAMP => Ok(Value::Timestamp(cur.read_i64_le()?)),
        tag::INT64 => Ok(Value::Int64(cur.read_i64_le()?)),
        other => Err(DecodeError::UnknownDocumentTag {
            tag: other,
            offset: tag_at,
        }),
    }
}

fn encode_document(doc: &Document, out: &mut Vec<u8>) {
    let size_at = out.len();
    out.extend_from_slice(&[0u8; 4]);
    for (key, value) in &doc.entries {
        out.push(value.tag());
        out.extend_from_slice(key.as_bytes());
        out.push(0);
        encode_value(value, out);
    }
    out.push(tag::END);
    let size = (out.len() - size_at) as i32;
    out[size_at..size_at + 4].copy_from_slice(&size.to_le_bytes());
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Double(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::String(s) => {
            out.extend_from_slice(&(s.len() as i32 + 1).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        Value::Document(d) => encode_document(d, out),
        Value::Array(items) => {
            let mut keyed = Document::new();
            for (i, item) in items.iter().enumerate() {
                keyed.entries.push((i.to_string(), item.clone()));
            }
            encode_document(&keyed, out);
        }
        Value::Binary { subtype, data } => {
            out.extend_from_slice(&(data.len() as i32).to_le_bytes());
            out.push(*subtype);
            out.extend_from_slice(data);
        }
        Value::ObjectId(id) => out.extend_from_slice(id),
        Value::Bool(b) => out.push(u8::from(*b)),
        Value::DateTime(v) | Value::Timestamp(v) | Value::Int64(v) => {
            out.extend_from_slice(&v.to_le_bytes())
        }
        Value::Null => {}
        Value::Int32(v) => out.extend_from_slice(&v.to_le_bytes()),
    }
}
