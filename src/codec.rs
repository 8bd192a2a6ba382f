//! Wire encoding of index mutations.
//!
//! The exact byte layout is opaque to the storage backend; what matters
//! for repair is that the encoding is deterministic, so that applying
//! the same record twice produces byte-identical entries and the
//! additive backend merges them into a single copy.

use bytes::Bytes;
use xxhash_rust::xxh64::xxh64;

use crate::engine::{ElementKey, Entry};
use crate::record::{StoredAttr, StoredRelation};
use crate::types::{Direction, PropValue, RelationId, VertexId};

const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_FLOAT: u8 = 0x03;
const TAG_TEXT: u8 = 0x04;
const TAG_BYTES: u8 = 0x05;
const TAG_VERTEX: u8 = 0x06;

const DIR_OUT: u8 = 0x00;
const DIR_IN: u8 = 0x01;

const COMPOSITE_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Element key of a vertex.
pub fn vertex_key(vertex: VertexId) -> ElementKey {
    ElementKey(Bytes::copy_from_slice(&vertex.to_be_bytes()))
}

/// Element key of a relation.
pub fn relation_key(relation: RelationId) -> ElementKey {
    ElementKey(Bytes::copy_from_slice(&relation.to_be_bytes()))
}

/// Document identifier derived from an element key.
pub fn document_id(key: &ElementKey) -> String {
    hex::encode(key.as_bytes())
}

/// Serializes one covered endpoint position of a relation into an
/// adjacency-index entry.
///
/// The column carries the direction tag, the relation type and the
/// relation id; the value carries the far endpoint (or the scalar
/// value, for properties) followed by the resolved secondary
/// attributes.
pub fn relation_entry(relation: &StoredRelation, pos: usize, dir: Direction) -> Entry {
    let mut column = Vec::with_capacity(relation.type_name.len() + 16);
    column.push(if dir == Direction::In { DIR_IN } else { DIR_OUT });
    write_str(&mut column, &relation.type_name);
    column.extend_from_slice(&relation.id.to_be_bytes());

    let mut value = Vec::new();
    match &relation.kind {
        crate::record::StoredRelationKind::Edge { out, into } => {
            // The entry stored under one endpoint points at the other.
            let far = if pos == 0 { *into } else { *out };
            value.extend_from_slice(&far.to_be_bytes());
        }
        crate::record::StoredRelationKind::Property { value: v, .. } => {
            write_prop_value(&mut value, v);
        }
    }
    for (key, attr) in &relation.attrs {
        write_str(&mut value, key);
        match attr {
            StoredAttr::Value(v) => write_prop_value(&mut value, v),
            StoredAttr::Vertex(v) => {
                value.push(TAG_VERTEX);
                value.extend_from_slice(&v.to_be_bytes());
            }
        }
    }

    Entry {
        column: Bytes::from(column),
        value: Bytes::from(value),
    }
}

/// Storage key of one composite field-value combination: a 64-bit hash
/// over the index name and the encoded field values, in field order.
pub fn composite_key(index_name: &str, values: &[&PropValue]) -> ElementKey {
    let mut buf = Vec::new();
    write_str(&mut buf, index_name);
    for value in values {
        write_prop_value(&mut buf, value);
    }
    let hash = xxh64(&buf, COMPOSITE_SEED);
    ElementKey(Bytes::copy_from_slice(&hash.to_be_bytes()))
}

/// Entry recording one element under a composite key.
pub fn composite_entry(element: &ElementKey) -> Entry {
    Entry {
        column: element.0.clone(),
        value: Bytes::new(),
    }
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn write_prop_value(buf: &mut Vec<u8>, value: &PropValue) {
    match value {
        PropValue::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
        PropValue::Int(i) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&i.to_be_bytes());
        }
        PropValue::Float(f) => {
            buf.push(TAG_FLOAT);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        PropValue::Text(s) => {
            buf.push(TAG_TEXT);
            write_str(buf, s);
        }
        PropValue::Bytes(b) => {
            buf.push(TAG_BYTES);
            buf.extend_from_slice(&(b.len() as u32).to_be_bytes());
            buf.extend_from_slice(b);
        }
    }
}
