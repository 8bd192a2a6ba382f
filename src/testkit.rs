//! In-memory graph engine implementing the repair contract.
//!
//! Backs the test suites and the CLI driver's dry-run mode. Mutations
//! are staged per transaction and only reach the shared state on
//! commit; storage entries merge additively (a re-applied identical
//! entry collapses to one copy) and document restores replace whole
//! documents, matching the semantics repair relies on for idempotence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::engine::{AdminTx, DocumentUpdates, ElementKey, Entry, GraphEngine, VertexResolver};
use crate::error::{RepairError, Result};
use crate::schema::IndexDescriptor;
use crate::types::{Direction, PropValue, SchemaStatus, VertexId};

#[derive(Default)]
struct SharedState {
    vertices: FxHashSet<VertexId>,
    relation_types: FxHashSet<String>,
    graph_indexes: BTreeMap<String, IndexDescriptor>,
    relation_indexes: BTreeMap<(String, String), IndexDescriptor>,
    index_statuses: BTreeMap<String, SchemaStatus>,
    field_statuses: BTreeMap<(String, String), SchemaStatus>,
    adjacency: BTreeMap<ElementKey, BTreeSet<Entry>>,
    index_entries: BTreeMap<ElementKey, BTreeSet<Entry>>,
    documents: BTreeMap<(String, String), BTreeMap<String, PropValue>>,
    restore_calls: BTreeMap<String, u64>,
    fail_mutations: bool,
    fail_restore: bool,
    fail_commit: bool,
}

/// In-memory graph connection.
#[derive(Clone)]
pub struct MemoryGraph {
    state: Arc<Mutex<SharedState>>,
    fail_shutdown: bool,
    closed: Arc<Mutex<bool>>,
}

impl MemoryGraph {
    /// Starts building a graph fixture.
    pub fn builder() -> MemoryGraphBuilder {
        MemoryGraphBuilder::default()
    }

    /// Builds a graph from a serialized snapshot.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut builder = Self::builder().vertices(snapshot.vertices.iter().copied());
        for index in &snapshot.indexes {
            builder = builder.graph_or_relation_index(index.descriptor.clone(), index.status);
            for (field, status) in &index.field_statuses {
                builder = builder.field_status(index.descriptor.name(), field, *status);
            }
        }
        builder.build()
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    /// Committed adjacency entries under `key`, in entry order.
    pub fn adjacency_entries(&self, key: &ElementKey) -> Vec<Entry> {
        self.state
            .lock()
            .adjacency
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Committed composite-index entries under `key`, in entry order.
    pub fn index_entries(&self, key: &ElementKey) -> Vec<Entry> {
        self.state
            .lock()
            .index_entries
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total committed composite-index entries across all keys.
    pub fn index_entry_count(&self) -> usize {
        self.state
            .lock()
            .index_entries
            .values()
            .map(BTreeSet::len)
            .sum()
    }

    /// Total committed adjacency entries across all keys.
    pub fn adjacency_entry_count(&self) -> usize {
        self.state
            .lock()
            .adjacency
            .values()
            .map(BTreeSet::len)
            .sum()
    }

    /// Committed document contents for `(store, doc_id)`.
    pub fn document(&self, store: &str, doc_id: &str) -> Option<BTreeMap<String, PropValue>> {
        self.state
            .lock()
            .documents
            .get(&(store.to_string(), doc_id.to_string()))
            .cloned()
    }

    /// Number of committed documents in `store`.
    pub fn document_count(&self, store: &str) -> usize {
        self.state
            .lock()
            .documents
            .keys()
            .filter(|(s, _)| s == store)
            .count()
    }

    /// Number of restore submissions issued against `store`.
    pub fn restore_calls(&self, store: &str) -> u64 {
        self.state
            .lock()
            .restore_calls
            .get(store)
            .copied()
            .unwrap_or(0)
    }
}

impl GraphEngine for MemoryGraph {
    type Tx = MemoryTx;

    fn open_admin_tx(&self) -> Result<MemoryTx> {
        if self.is_closed() {
            return Err(RepairError::Backend("graph connection is closed".into()));
        }
        Ok(MemoryTx {
            state: Arc::clone(&self.state),
            staged_adjacency: Vec::new(),
            staged_index: Vec::new(),
            staged_docs: Vec::new(),
        })
    }

    fn close(&mut self) -> Result<()> {
        if self.fail_shutdown {
            return Err(RepairError::Backend("injected shutdown failure".into()));
        }
        *self.closed.lock() = true;
        Ok(())
    }
}

/// Administrative transaction over a [`MemoryGraph`].
pub struct MemoryTx {
    state: Arc<Mutex<SharedState>>,
    staged_adjacency: Vec<(ElementKey, Vec<Entry>)>,
    staged_index: Vec<(ElementKey, Vec<Entry>)>,
    staged_docs: Vec<(String, DocumentUpdates)>,
}

impl VertexResolver for MemoryTx {
    fn resolve_vertex(&self, vertex: VertexId) -> Result<Option<VertexId>> {
        Ok(self.state.lock().vertices.contains(&vertex).then_some(vertex))
    }
}

impl AdminTx for MemoryTx {
    fn graph_index(&self, name: &str) -> Result<Option<IndexDescriptor>> {
        Ok(self.state.lock().graph_indexes.get(name).cloned())
    }

    fn relation_index(
        &self,
        relation_type: &str,
        name: &str,
    ) -> Result<Option<IndexDescriptor>> {
        let state = self.state.lock();
        if !state.relation_types.contains(relation_type) {
            return Err(RepairError::UnknownRelationType(relation_type.to_string()));
        }
        Ok(state
            .relation_indexes
            .get(&(relation_type.to_string(), name.to_string()))
            .cloned())
    }

    fn index_status(&self, name: &str) -> Result<SchemaStatus> {
        self.state
            .lock()
            .index_statuses
            .get(name)
            .copied()
            .ok_or_else(|| RepairError::UnknownIndex(name.to_string()))
    }

    fn field_status(&self, index: &str, field: &str) -> Result<SchemaStatus> {
        let state = self.state.lock();
        state
            .field_statuses
            .get(&(index.to_string(), field.to_string()))
            .or_else(|| state.index_statuses.get(index))
            .copied()
            .ok_or_else(|| RepairError::UnknownIndex(format!("{index}.{field}")))
    }

    fn mutate_adjacency(&mut self, key: ElementKey, additions: Vec<Entry>) -> Result<()> {
        if self.state.lock().fail_mutations {
            return Err(RepairError::Backend("injected mutation failure".into()));
        }
        self.staged_adjacency.push((key, additions));
        Ok(())
    }

    fn mutate_index(&mut self, key: ElementKey, additions: Vec<Entry>) -> Result<()> {
        if self.state.lock().fail_mutations {
            return Err(RepairError::Backend("injected mutation failure".into()));
        }
        self.staged_index.push((key, additions));
        Ok(())
    }

    fn restore_documents(&mut self, backing_store: &str, docs: DocumentUpdates) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_restore {
            return Err(RepairError::Backend("injected restore failure".into()));
        }
        *state
            .restore_calls
            .entry(backing_store.to_string())
            .or_insert(0) += 1;
        drop(state);
        self.staged_docs.push((backing_store.to_string(), docs));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_commit {
            return Err(RepairError::Backend("injected commit failure".into()));
        }
        for (key, additions) in self.staged_adjacency.drain(..) {
            state.adjacency.entry(key).or_default().extend(additions);
        }
        for (key, additions) in self.staged_index.drain(..) {
            state.index_entries.entry(key).or_default().extend(additions);
        }
        for (_backing, docs) in self.staged_docs.drain(..) {
            for (store, documents) in docs {
                for (doc_id, entries) in documents {
                    let doc = entries
                        .into_iter()
                        .map(|e| (e.field, e.value))
                        .collect::<BTreeMap<_, _>>();
                    state.documents.insert((store.clone(), doc_id), doc);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.staged_adjacency.clear();
        self.staged_index.clear();
        self.staged_docs.clear();
        Ok(())
    }
}

/// Builder for [`MemoryGraph`] fixtures.
#[derive(Default)]
pub struct MemoryGraphBuilder {
    state: SharedState,
    fail_shutdown: bool,
}

impl MemoryGraphBuilder {
    /// Adds live vertices.
    pub fn vertices(mut self, ids: impl IntoIterator<Item = VertexId>) -> Self {
        self.state.vertices.extend(ids);
        self
    }

    /// Registers a graph-level index with its status.
    pub fn graph_index(mut self, descriptor: IndexDescriptor, status: SchemaStatus) -> Self {
        self.state
            .index_statuses
            .insert(descriptor.name().to_string(), status);
        self.state
            .graph_indexes
            .insert(descriptor.name().to_string(), descriptor);
        self
    }

    /// Registers an adjacency index under a relation type.
    pub fn relation_index(
        mut self,
        relation_type: &str,
        name: &str,
        covered: Direction,
        status: SchemaStatus,
    ) -> Self {
        let descriptor = IndexDescriptor::RelationType {
            name: name.to_string(),
            relation_type: relation_type.to_string(),
            covered,
        };
        self.state.relation_types.insert(relation_type.to_string());
        self.state.index_statuses.insert(name.to_string(), status);
        self.state
            .relation_indexes
            .insert((relation_type.to_string(), name.to_string()), descriptor);
        self
    }

    /// Registers a known relation type without any index under it.
    pub fn relation_type(mut self, name: &str) -> Self {
        self.state.relation_types.insert(name.to_string());
        self
    }

    /// Sets the status of one indexed field key of a mixed index.
    pub fn field_status(mut self, index: &str, field: &str, status: SchemaStatus) -> Self {
        self.state
            .field_statuses
            .insert((index.to_string(), field.to_string()), status);
        self
    }

    /// Registers a descriptor in whichever scope its kind dictates.
    pub fn graph_or_relation_index(self, descriptor: IndexDescriptor, status: SchemaStatus) -> Self {
        match &descriptor {
            IndexDescriptor::RelationType {
                name,
                relation_type,
                covered,
            } => {
                let (name, relation_type, covered) =
                    (name.clone(), relation_type.clone(), *covered);
                self.relation_index(&relation_type, &name, covered, status)
            }
            _ => self.graph_index(descriptor, status),
        }
    }

    /// Makes every entry/document mutation fail.
    pub fn fail_mutations(mut self) -> Self {
        self.state.fail_mutations = true;
        self
    }

    /// Makes document restores fail.
    pub fn fail_restore(mut self) -> Self {
        self.state.fail_restore = true;
        self
    }

    /// Makes commit fail.
    pub fn fail_commit(mut self) -> Self {
        self.state.fail_commit = true;
        self
    }

    /// Makes connection close fail.
    pub fn fail_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    /// Finishes the fixture.
    pub fn build(self) -> MemoryGraph {
        MemoryGraph {
            state: Arc::new(Mutex::new(self.state)),
            fail_shutdown: self.fail_shutdown,
            closed: Arc::new(Mutex::new(false)),
        }
    }
}

/// Serialized form of a graph fixture, consumed by the CLI driver.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Live vertex identifiers.
    #[serde(default)]
    pub vertices: Vec<VertexId>,
    /// Index definitions with their statuses.
    #[serde(default)]
    pub indexes: Vec<SnapshotIndex>,
}

/// One index definition inside a [`GraphSnapshot`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotIndex {
    /// The index descriptor.
    #[serde(flatten)]
    pub descriptor: IndexDescriptor,
    /// Status of the index's schema vertex.
    pub status: SchemaStatus,
    /// Per-field statuses for mixed indexes; fields not listed inherit
    /// the index status.
    #[serde(default)]
    pub field_statuses: BTreeMap<String, SchemaStatus>,
}
