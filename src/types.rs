//! Core identifiers and value types shared across the repair engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a vertex in the canonical record stream.
pub type VertexId = u64;
/// Identifier of a relation (edge or property) in the canonical record stream.
pub type RelationId = u64;

/// Direction of a relation relative to a vertex.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Outgoing: the vertex is the relation's source endpoint.
    Out,
    /// Incoming: the vertex is the relation's target endpoint.
    In,
    /// Both endpoints (loops, or index coverage of both directions).
    Both,
}

impl Direction {
    /// Maps an endpoint position to its direction: position 0 is the
    /// source (`Out`), position 1 the target (`In`).
    pub fn from_position(pos: usize) -> Option<Direction> {
        match pos {
            0 => Some(Direction::Out),
            1 => Some(Direction::In),
            _ => None,
        }
    }

    /// Whether an index covering `self` produces an entry for `dir`.
    pub fn covers(self, dir: Direction) -> bool {
        self == Direction::Both || self == dir
    }
}

/// Kind of graph element an index ranges over.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// The vertex itself.
    Vertex,
    /// Edges adjacent to the vertex.
    Edge,
    /// Properties attached to the vertex.
    Property,
}

/// Lifecycle status of an index (or of one indexed field key).
///
/// Statuses are ordered: `New → Installed → Registered → Enabled → Disabled`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaStatus {
    /// Declared but not yet installed on any instance.
    New,
    /// Installed on every instance, not yet registered.
    Installed,
    /// Registered cluster-wide; writes flow, reads may not.
    Registered,
    /// Fully enabled for reads and writes.
    Enabled,
    /// Retired; no longer written.
    Disabled,
}

impl SchemaStatus {
    /// Repair may proceed only from `Registered` or `Enabled`.
    pub fn is_repairable(self) -> bool {
        matches!(self, SchemaStatus::Registered | SchemaStatus::Enabled)
    }
}

impl fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaStatus::New => "NEW",
            SchemaStatus::Installed => "INSTALLED",
            SchemaStatus::Registered => "REGISTERED",
            SchemaStatus::Enabled => "ENABLED",
            SchemaStatus::Disabled => "DISABLED",
        };
        f.write_str(name)
    }
}

/// A scalar property value carried by vertices and relations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}
