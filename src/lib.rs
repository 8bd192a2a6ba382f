//! Distributed index-repair worker for the Umbra graph database.
//!
//! A repair job recomputes one named secondary index from the canonical
//! vertex/edge record stream. The enclosing distributed-batch framework
//! partitions the stream and schedules one [`worker::RepairWorker`] per
//! partition; each worker owns a single administrative transaction,
//! validates that the index's status permits repair, turns every input
//! record into additive index mutations, and commits once at teardown.
//!
//! Three index kinds are supported, dispatched per record on the
//! [`schema::IndexDescriptor`] variant: adjacency-keyed relation-type
//! indexes, composite exact-match indexes, and document-style mixed
//! indexes backed by an external search store.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod mutation;
pub mod record;
pub mod schema;
pub mod testkit;
pub mod types;
pub mod worker;

pub use config::RepairConfig;
pub use error::{RepairError, Result};
pub use record::GraphRecord;
pub use schema::IndexDescriptor;
pub use types::{Direction, ElementKind, PropValue, SchemaStatus};
pub use worker::{Counter, RepairCounters, RepairReport, RepairWorker, WorkerState};
