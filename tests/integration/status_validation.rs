#![allow(missing_docs)]

//! Status state-machine coverage across every index kind.

use umbra_reindex::engine::GraphEngine;
use umbra_reindex::schema::{resolve_descriptor, validate_index_status};
use umbra_reindex::testkit::MemoryGraph;
use umbra_reindex::{
    Direction, ElementKind, IndexDescriptor, RepairError, SchemaStatus,
};

const ALL_STATUSES: [SchemaStatus; 5] = [
    SchemaStatus::New,
    SchemaStatus::Installed,
    SchemaStatus::Registered,
    SchemaStatus::Enabled,
    SchemaStatus::Disabled,
];

#[test]
fn relation_index_status_table() {
    for status in ALL_STATUSES {
        let graph = MemoryGraph::builder()
            .relation_index("knows", "byKnows", Direction::Both, status)
            .build();
        let tx = graph.open_admin_tx().expect("tx");
        let descriptor = resolve_descriptor(&tx, "byKnows", Some("knows")).expect("resolve");
        let outcome = validate_index_status(&tx, &descriptor);
        assert_eq!(outcome.is_ok(), status.is_repairable(), "status {status}");
    }
}

#[test]
fn composite_index_status_table() {
    for status in ALL_STATUSES {
        let descriptor = IndexDescriptor::Composite {
            name: "byName".into(),
            element: ElementKind::Vertex,
            fields: vec!["name".into()],
        };
        let graph = MemoryGraph::builder()
            .graph_index(descriptor, status)
            .build();
        let tx = graph.open_admin_tx().expect("tx");
        let descriptor = resolve_descriptor(&tx, "byName", None).expect("resolve");
        let outcome = validate_index_status(&tx, &descriptor);
        assert_eq!(outcome.is_ok(), status.is_repairable(), "status {status}");
    }
}

#[test]
fn mixed_index_tolerates_disabled_fields_only() {
    for status in ALL_STATUSES {
        let descriptor = IndexDescriptor::Mixed {
            name: "search".into(),
            element: ElementKind::Vertex,
            fields: vec!["name".into(), "age".into()],
            backing_store: "search1".into(),
        };
        let graph = MemoryGraph::builder()
            .graph_index(descriptor, SchemaStatus::Enabled)
            .field_status("search", "name", SchemaStatus::Enabled)
            .field_status("search", "age", status)
            .build();
        let tx = graph.open_admin_tx().expect("tx");
        let descriptor = resolve_descriptor(&tx, "search", None).expect("resolve");
        let outcome = validate_index_status(&tx, &descriptor);

        let tolerated = status.is_repairable() || status == SchemaStatus::Disabled;
        assert_eq!(outcome.is_ok(), tolerated, "field status {status}");
        if let Ok(validated) = outcome {
            let IndexDescriptor::Mixed { fields, .. } = validated.descriptor() else {
                panic!("descriptor must stay mixed");
            };
            let expected: &[&str] = if status == SchemaStatus::Disabled {
                &["name"]
            } else {
                &["name", "age"]
            };
            let got: Vec<&str> = fields.iter().map(String::as_str).collect();
            assert_eq!(got, expected, "field status {status}");
        }
    }
}

#[test]
fn relation_scoped_lookup_rejects_graph_level_descriptor() {
    // A composite index registered under a relation type is a schema
    // defect from the repair engine's point of view.
    let graph = MemoryGraph::builder()
        .relation_type("knows")
        .graph_index(
            IndexDescriptor::Composite {
                name: "byName".into(),
                element: ElementKind::Vertex,
                fields: vec!["name".into()],
            },
            SchemaStatus::Enabled,
        )
        .build();
    let tx = graph.open_admin_tx().expect("tx");
    // Scoped lookup finds nothing under "knows".
    let err = resolve_descriptor(&tx, "byName", Some("knows")).expect_err("must fail");
    assert!(matches!(err, RepairError::UnknownIndex(_)));
}
