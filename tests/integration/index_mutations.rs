#![allow(missing_docs)]

//! Mutation-shape coverage: additive idempotence across the three index
//! kinds, unresolved-endpoint skipping, and mixed-field filtering.

use umbra_reindex::codec;
use umbra_reindex::record::{
    AttrSource, GraphRecord, RecordRelation, RelationShape, SecondaryAttr,
};
use umbra_reindex::testkit::MemoryGraph;
use umbra_reindex::{
    Direction, ElementKind, IndexDescriptor, PropValue, RepairConfig, RepairWorker, SchemaStatus,
};

fn alice_record() -> GraphRecord {
    GraphRecord {
        vertex: 1,
        relations: vec![RecordRelation {
            id: 100,
            type_name: "name".into(),
            shape: RelationShape::Property {
                value: PropValue::from("alice"),
            },
            attrs: Vec::new(),
        }],
    }
}

fn run_repair(graph: &MemoryGraph, config: RepairConfig, record: &GraphRecord) {
    let worker = RepairWorker::new(graph.clone(), config).expect("worker");
    worker.run([record.clone()]).expect("run");
}

#[test]
fn composite_double_apply_adds_no_duplicate_entries() {
    let descriptor = IndexDescriptor::Composite {
        name: "byName".into(),
        element: ElementKind::Vertex,
        fields: vec!["name".into()],
    };
    let graph = MemoryGraph::builder()
        .vertices([1])
        .graph_index(descriptor, SchemaStatus::Enabled)
        .build();

    run_repair(&graph, RepairConfig::graph_index("byName"), &alice_record());
    let after_first = graph.index_entry_count();
    run_repair(&graph, RepairConfig::graph_index("byName"), &alice_record());

    assert_eq!(after_first, 1);
    assert_eq!(graph.index_entry_count(), 1);
}

#[test]
fn relation_index_double_apply_adds_no_duplicate_entries() {
    let graph = MemoryGraph::builder()
        .vertices([1, 2])
        .relation_index("knows", "byKnows", Direction::Both, SchemaStatus::Enabled)
        .build();
    let record = GraphRecord {
        vertex: 1,
        relations: vec![RecordRelation {
            id: 101,
            type_name: "knows".into(),
            shape: RelationShape::Edge { out: 1, into: 2 },
            attrs: Vec::new(),
        }],
    };
    let config = RepairConfig::relation_index("byKnows", "knows");

    run_repair(&graph, config.clone(), &record);
    run_repair(&graph, config, &record);

    assert_eq!(graph.adjacency_entry_count(), 1);
}

#[test]
fn mixed_double_apply_produces_the_same_document() {
    let descriptor = IndexDescriptor::Mixed {
        name: "search".into(),
        element: ElementKind::Vertex,
        fields: vec!["name".into()],
        backing_store: "search1".into(),
    };
    let graph = MemoryGraph::builder()
        .vertices([1])
        .graph_index(descriptor, SchemaStatus::Enabled)
        .build();
    let doc_id = codec::document_id(&codec::vertex_key(1));

    run_repair(&graph, RepairConfig::graph_index("search"), &alice_record());
    let first = graph.document("search1", &doc_id).expect("document");
    run_repair(&graph, RepairConfig::graph_index("search"), &alice_record());
    let second = graph.document("search1", &doc_id).expect("document");

    assert_eq!(first, second);
    assert_eq!(graph.document_count("search1"), 1);
    assert_eq!(graph.restore_calls("search1"), 2);
}

#[test]
fn deleted_endpoint_skips_the_relation_without_failing() {
    // Vertex 2 has been deleted since the record was written.
    let graph = MemoryGraph::builder()
        .vertices([1])
        .relation_index("knows", "byKnows", Direction::Both, SchemaStatus::Enabled)
        .build();
    let record = GraphRecord {
        vertex: 1,
        relations: vec![RecordRelation {
            id: 101,
            type_name: "knows".into(),
            shape: RelationShape::Edge { out: 1, into: 2 },
            attrs: Vec::new(),
        }],
    };

    let worker = RepairWorker::new(
        graph.clone(),
        RepairConfig::relation_index("byKnows", "knows"),
    )
    .expect("worker");
    let report = worker.run([record]).expect("run must succeed");

    assert_eq!(report.records, 1);
    assert_eq!(report.counters.successful_transactions, 1);
    assert_eq!(graph.adjacency_entry_count(), 0);
}

#[test]
fn edge_attrs_survive_into_adjacency_entries() {
    let graph = MemoryGraph::builder()
        .vertices([1, 2])
        .relation_index("knows", "byKnows", Direction::Both, SchemaStatus::Enabled)
        .build();
    let plain = GraphRecord {
        vertex: 1,
        relations: vec![RecordRelation {
            id: 101,
            type_name: "knows".into(),
            shape: RelationShape::Edge { out: 1, into: 2 },
            attrs: Vec::new(),
        }],
    };
    let mut weighted = plain.clone();
    weighted.relations[0].attrs = vec![SecondaryAttr {
        key: "weight".into(),
        value: AttrSource::Value(PropValue::Int(3)),
    }];

    run_repair(
        &graph,
        RepairConfig::relation_index("byKnows", "knows"),
        &weighted,
    );
    let with_attr = graph.adjacency_entries(&codec::vertex_key(1));
    assert_eq!(with_attr.len(), 1);

    // The attribute is part of the entry payload.
    let graph_plain = MemoryGraph::builder()
        .vertices([1, 2])
        .relation_index("knows", "byKnows", Direction::Both, SchemaStatus::Enabled)
        .build();
    run_repair(
        &graph_plain,
        RepairConfig::relation_index("byKnows", "knows"),
        &plain,
    );
    let without_attr = graph_plain.adjacency_entries(&codec::vertex_key(1));
    assert_ne!(with_attr[0].value, without_attr[0].value);
    assert_eq!(with_attr[0].column, without_attr[0].column);
}

#[test]
fn mixed_index_skips_disabled_fields_in_documents() {
    let descriptor = IndexDescriptor::Mixed {
        name: "search".into(),
        element: ElementKind::Vertex,
        fields: vec!["name".into(), "age".into()],
        backing_store: "search1".into(),
    };
    let graph = MemoryGraph::builder()
        .vertices([1])
        .graph_index(descriptor, SchemaStatus::Enabled)
        .field_status("search", "age", SchemaStatus::Disabled)
        .build();
    let mut record = alice_record();
    record.relations.push(RecordRelation {
        id: 102,
        type_name: "age".into(),
        shape: RelationShape::Property {
            value: PropValue::Int(30),
        },
        attrs: Vec::new(),
    });

    run_repair(&graph, RepairConfig::graph_index("search"), &record);

    let doc_id = codec::document_id(&codec::vertex_key(1));
    let doc = graph.document("search1", &doc_id).expect("document");
    assert_eq!(doc.get("name"), Some(&PropValue::from("alice")));
    assert!(!doc.contains_key("age"));
}

#[test]
fn edge_elements_feed_graph_indexes_on_edge_kind() {
    let descriptor = IndexDescriptor::Composite {
        name: "byWeight".into(),
        element: ElementKind::Edge,
        fields: vec!["weight".into()],
    };
    let graph = MemoryGraph::builder()
        .vertices([1, 2])
        .graph_index(descriptor, SchemaStatus::Enabled)
        .build();
    let record = GraphRecord {
        vertex: 1,
        relations: vec![RecordRelation {
            id: 101,
            type_name: "knows".into(),
            shape: RelationShape::Edge { out: 1, into: 2 },
            attrs: vec![SecondaryAttr {
                key: "weight".into(),
                value: AttrSource::Value(PropValue::Int(3)),
            }],
        }],
    };

    run_repair(&graph, RepairConfig::graph_index("byWeight"), &record);

    let key = codec::composite_key("byWeight", &[&PropValue::Int(3)]);
    assert_eq!(graph.index_entries(&key).len(), 1);
}
