//! Input records and the decoder that turns their relations back into
//! storage-engine relation objects.
//!
//! A [`GraphRecord`] is one row of the canonical record stream: a vertex
//! and every relation adjacent to it, as materialized by the input
//! format. Decoding resolves endpoint identifiers against the live
//! transaction; a relation whose endpoints no longer exist decodes to
//! `None` and is skipped by the caller, never treated as an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::VertexResolver;
use crate::error::Result;
use crate::types::{Direction, PropValue, RelationId, VertexId};

/// One vertex of the canonical record stream together with its adjacent
/// relations as the input format materialized them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphRecord {
    /// The vertex this record describes.
    pub vertex: VertexId,
    /// Relations adjacent to the vertex, both edges and properties.
    #[serde(default)]
    pub relations: Vec<RecordRelation>,
}

impl GraphRecord {
    /// Creates a record with no relations.
    pub fn new(vertex: VertexId) -> Self {
        Self {
            vertex,
            relations: Vec::new(),
        }
    }

    /// Iterator over the property-shaped relations of the record.
    pub fn properties(&self) -> impl Iterator<Item = &RecordRelation> {
        self.relations.iter().filter(|r| r.is_property())
    }

    /// Iterator over the edge-shaped relations of the record.
    pub fn edges(&self) -> impl Iterator<Item = &RecordRelation> {
        self.relations.iter().filter(|r| r.is_edge())
    }

    /// Value of the named vertex property, if the record carries one.
    pub fn property_value(&self, key: &str) -> Option<&PropValue> {
        self.relations.iter().find_map(|r| match &r.shape {
            RelationShape::Property { value } if r.type_name == key => Some(value),
            _ => None,
        })
    }
}

/// One serialized relation inside a [`GraphRecord`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordRelation {
    /// Relation identifier from the canonical store.
    pub id: RelationId,
    /// Name of the relation's type (edge label or property key).
    #[serde(rename = "type")]
    pub type_name: String,
    /// Edge or property shape, with the shape-specific payload.
    #[serde(flatten)]
    pub shape: RelationShape,
    /// Secondary attributes attached to the relation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<SecondaryAttr>,
}

impl RecordRelation {
    /// Whether the relation is edge-shaped.
    pub fn is_edge(&self) -> bool {
        matches!(self.shape, RelationShape::Edge { .. })
    }

    /// Whether the relation is property-shaped.
    pub fn is_property(&self) -> bool {
        matches!(self.shape, RelationShape::Property { .. })
    }

    /// Direction of the relation relative to `vertex`.
    ///
    /// Properties are always outgoing from their owner. A loop edge
    /// (both endpoints equal to `vertex`) reports `Both`.
    pub fn direction(&self, vertex: VertexId) -> Direction {
        match self.shape {
            RelationShape::Property { .. } => Direction::Out,
            RelationShape::Edge { out, into } => {
                if out == vertex && into == vertex {
                    Direction::Both
                } else if out == vertex {
                    Direction::Out
                } else {
                    Direction::In
                }
            }
        }
    }

    /// Value of the named secondary attribute when it is scalar.
    pub fn attr_value(&self, key: &str) -> Option<&PropValue> {
        self.attrs.iter().find_map(|a| match &a.value {
            AttrSource::Value(v) if a.key == key => Some(v),
            _ => None,
        })
    }
}

/// Shape of a relation: an edge between two vertices, or a property
/// owned by the record vertex.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationShape {
    /// Edge with its two endpoint vertex identifiers.
    Edge {
        /// Source endpoint.
        out: VertexId,
        /// Target endpoint.
        #[serde(rename = "in")]
        into: VertexId,
    },
    /// Property with its scalar value; the owner is the record vertex.
    Property {
        /// The property's value.
        value: PropValue,
    },
}

/// A secondary attribute on a relation, either a scalar or a reference
/// to another vertex.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecondaryAttr {
    /// Attribute key.
    pub key: String,
    /// Scalar payload or vertex reference.
    pub value: AttrSource,
}

/// Payload of a secondary attribute as carried by the input format.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrSource {
    /// A scalar value, copied through verbatim.
    Value(PropValue),
    /// A unidirected edge to another vertex; resolved at decode time.
    Vertex(VertexId),
}

/// A relation reconstructed against the live transaction, ready for
/// serialization into index entries.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRelation {
    /// Relation identifier.
    pub id: RelationId,
    /// Relation type name.
    pub type_name: String,
    /// Resolved shape.
    pub kind: StoredRelationKind,
    /// Secondary attributes with vertex references resolved.
    pub attrs: BTreeMap<String, StoredAttr>,
}

/// Resolved shape of a [`StoredRelation`].
#[derive(Clone, Debug, PartialEq)]
pub enum StoredRelationKind {
    /// Edge with both endpoints resolved.
    Edge {
        /// Source endpoint.
        out: VertexId,
        /// Target endpoint.
        into: VertexId,
    },
    /// Property with its resolved owner.
    Property {
        /// Owning vertex.
        vertex: VertexId,
        /// Scalar value.
        value: PropValue,
    },
}

/// A resolved secondary attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredAttr {
    /// Scalar payload.
    Value(PropValue),
    /// Resolved vertex reference.
    Vertex(VertexId),
}

impl StoredRelation {
    /// Number of endpoints: two for edges, one for properties.
    pub fn arity(&self) -> usize {
        match self.kind {
            StoredRelationKind::Edge { .. } => 2,
            StoredRelationKind::Property { .. } => 1,
        }
    }

    /// Endpoint at `pos` (0 = source/owner, 1 = target).
    pub fn endpoint(&self, pos: usize) -> Option<VertexId> {
        match (&self.kind, pos) {
            (StoredRelationKind::Edge { out, .. }, 0) => Some(*out),
            (StoredRelationKind::Edge { into, .. }, 1) => Some(*into),
            (StoredRelationKind::Property { vertex, .. }, 0) => Some(*vertex),
            _ => None,
        }
    }
}

/// Reconstructs a [`StoredRelation`] from one serialized relation,
/// resolving every endpoint through `tx`.
///
/// Returns `Ok(None)` when an endpoint (either edge endpoint, or the
/// property's owner) cannot be resolved, for instance because the
/// vertex has been deleted since the record was written. Secondary
/// attributes with unresolvable vertex references are dropped, not
/// errors. This function only reads through the transaction.
pub fn decode_relation(
    rel: &RecordRelation,
    owner: VertexId,
    tx: &dyn VertexResolver,
) -> Result<Option<StoredRelation>> {
    let kind = match rel.shape {
        RelationShape::Edge { out, into } => {
            let (Some(out), Some(into)) = (tx.resolve_vertex(out)?, tx.resolve_vertex(into)?)
            else {
                debug!(
                    relation = rel.id,
                    relation_type = %rel.type_name,
                    "repair.decode.unresolved_endpoint"
                );
                return Ok(None);
            };
            StoredRelationKind::Edge { out, into }
        }
        RelationShape::Property { ref value } => {
            let Some(vertex) = tx.resolve_vertex(owner)? else {
                debug!(
                    relation = rel.id,
                    relation_type = %rel.type_name,
                    "repair.decode.unresolved_owner"
                );
                return Ok(None);
            };
            StoredRelationKind::Property {
                vertex,
                value: value.clone(),
            }
        }
    };

    let mut attrs = BTreeMap::new();
    for attr in &rel.attrs {
        match &attr.value {
            AttrSource::Value(v) => {
                attrs.insert(attr.key.clone(), StoredAttr::Value(v.clone()));
            }
            AttrSource::Vertex(v) => match tx.resolve_vertex(*v)? {
                Some(resolved) => {
                    attrs.insert(attr.key.clone(), StoredAttr::Vertex(resolved));
                }
                None => {
                    debug!(
                        relation = rel.id,
                        attr = %attr.key,
                        "repair.decode.unresolved_attr"
                    );
                }
            },
        }
    }

    Ok(Some(StoredRelation {
        id: rel.id,
        type_name: rel.type_name.clone(),
        kind,
        attrs,
    }))
}
