//! Turns one input record into index mutations and applies them.
//!
//! Dispatch happens once per record on the [`IndexDescriptor`] variant.
//! All writes are additive: repair never issues deletions, and the
//! mixed branch writes whole documents, so re-applying a record is
//! harmless.

use std::collections::BTreeMap;

use crate::codec;
use crate::engine::{AdminTx, DocumentUpdates, ElementKey, IndexEntry};
use crate::error::Result;
use crate::record::{decode_relation, GraphRecord, RecordRelation, RelationShape};
use crate::schema::{IndexDescriptor, ValidatedIndex};
use crate::types::{Direction, ElementKind, PropValue};

/// Computes and applies every mutation the record contributes to the
/// index under repair.
///
/// Any error computing or applying a mutation propagates to the worker
/// lifecycle, which rolls back the administrative transaction and fails
/// the worker. Relations whose endpoints cannot be resolved are
/// skipped, not errors.
pub fn repair_record<T: AdminTx>(
    tx: &mut T,
    index: &ValidatedIndex,
    record: &GraphRecord,
) -> Result<()> {
    match index.descriptor() {
        IndexDescriptor::RelationType {
            relation_type,
            covered,
            ..
        } => repair_relation_index(tx, record, relation_type, *covered),
        IndexDescriptor::Composite {
            name,
            element,
            fields,
        } => repair_composite(tx, record, name, *element, fields),
        IndexDescriptor::Mixed {
            element,
            fields,
            backing_store,
            ..
        } => repair_mixed(tx, record, *element, fields, backing_store),
    }
}

/// Adjacency-keyed branch: only relations of the target type, seen from
/// their canonical out-going side, contribute entries. Indexing from
/// the out-going side alone avoids duplicate entries from the two
/// endpoints of an edge; within a relation, a position produces an
/// entry only when the index configuration covers its direction and the
/// position's endpoint is the record vertex itself, since the entry is
/// keyed by that vertex.
fn repair_relation_index<T: AdminTx>(
    tx: &mut T,
    record: &GraphRecord,
    relation_type: &str,
    covered: Direction,
) -> Result<()> {
    let mut additions = Vec::new();
    for rel in &record.relations {
        if rel.type_name != relation_type || rel.direction(record.vertex) != Direction::Out {
            continue;
        }
        let Some(stored) = decode_relation(rel, record.vertex, tx)? else {
            continue;
        };
        for pos in 0..stored.arity() {
            let Some(dir) = Direction::from_position(pos) else {
                continue;
            };
            if stored.endpoint(pos) != Some(record.vertex) || !covered.covers(dir) {
                continue;
            }
            additions.push(codec::relation_entry(&stored, pos, dir));
        }
    }
    tx.mutate_adjacency(codec::vertex_key(record.vertex), additions)
}

/// Composite branch: each element with every indexed field present maps
/// to one entry under the hash of its field-value combination.
fn repair_composite<T: AdminTx>(
    tx: &mut T,
    record: &GraphRecord,
    name: &str,
    element: ElementKind,
    fields: &[String],
) -> Result<()> {
    for elem in gather_elements(record, element) {
        let values: Vec<&PropValue> = fields
            .iter()
            .filter_map(|field| elem.field_value(field))
            .collect();
        if values.len() != fields.len() {
            continue;
        }
        let key = codec::composite_key(name, &values);
        let entry = codec::composite_entry(&elem.key());
        tx.mutate_index(key, vec![entry])?;
    }
    Ok(())
}

/// Mixed branch: all elements' field contributions for the record are
/// grouped by (store, document) and submitted as one full-document
/// restore against the backing search store.
fn repair_mixed<T: AdminTx>(
    tx: &mut T,
    record: &GraphRecord,
    element: ElementKind,
    fields: &[String],
    backing_store: &str,
) -> Result<()> {
    let mut docs: DocumentUpdates = BTreeMap::new();
    for elem in gather_elements(record, element) {
        let entries: Vec<IndexEntry> = fields
            .iter()
            .filter_map(|field| {
                elem.field_value(field).map(|value| IndexEntry {
                    field: field.clone(),
                    value: value.clone(),
                })
            })
            .collect();
        if entries.is_empty() {
            continue;
        }
        docs.entry(backing_store.to_string())
            .or_default()
            .insert(codec::document_id(&elem.key()), entries);
    }
    tx.restore_documents(backing_store, docs)
}

/// One element of a record as seen by a graph-level index.
enum IndexedElement<'a> {
    Vertex(&'a GraphRecord),
    Relation(&'a RecordRelation),
}

impl IndexedElement<'_> {
    fn key(&self) -> ElementKey {
        match self {
            IndexedElement::Vertex(record) => codec::vertex_key(record.vertex),
            IndexedElement::Relation(rel) => codec::relation_key(rel.id),
        }
    }

    /// Value the element carries for one indexed field.
    ///
    /// A vertex reads its own properties; a property relation answers
    /// for its own key with its own value, otherwise through its
    /// secondary attributes; an edge only through its attributes.
    fn field_value(&self, field: &str) -> Option<&PropValue> {
        match self {
            IndexedElement::Vertex(record) => record.property_value(field),
            IndexedElement::Relation(rel) => match &rel.shape {
                RelationShape::Property { value } if rel.type_name == field => Some(value),
                _ => rel.attr_value(field),
            },
        }
    }
}

fn gather_elements<'a>(record: &'a GraphRecord, kind: ElementKind) -> Vec<IndexedElement<'a>> {
    match kind {
        ElementKind::Vertex => vec![IndexedElement::Vertex(record)],
        ElementKind::Property => record.properties().map(IndexedElement::Relation).collect(),
        ElementKind::Edge => record.edges().map(IndexedElement::Relation).collect(),
    }
}
