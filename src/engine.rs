//! Contract the repair engine requires from the graph engine.
//!
//! The storage engine, its data layout, and the search backend are
//! external collaborators. The worker only needs the narrow surface
//! below: an administrative transaction with schema lookup, vertex
//! resolution, additive entry mutation, document restore, and
//! commit/rollback. [`crate::testkit`] carries an in-memory
//! implementation used by the tests and the CLI driver.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::Result;
use crate::schema::IndexDescriptor;
use crate::types::{PropValue, SchemaStatus, VertexId};

/// Key addressing one element's entries in the storage backend.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ElementKey(pub Bytes);

impl ElementKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// One storage-level entry addition: a column/value pair under some
/// element key. Repair only ever adds entries; deletions are never
/// issued by this path.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Entry {
    /// Column qualifier within the element key's row.
    pub column: Bytes,
    /// Entry payload.
    pub value: Bytes,
}

/// One field/value pair contributed to a document-store document.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexEntry {
    /// Document field name.
    pub field: String,
    /// Field value.
    pub value: PropValue,
}

/// Full-document updates grouped by logical store name, then document
/// id. Submitted as a single restore (upsert) per record, which keeps
/// repair idempotent per document.
pub type DocumentUpdates = BTreeMap<String, BTreeMap<String, Vec<IndexEntry>>>;

/// Read-only vertex resolution against the live transaction.
///
/// Split from [`AdminTx`] so the record decoder can be exercised
/// without a full transaction implementation.
pub trait VertexResolver {
    /// Resolves a vertex identifier, returning `None` when the vertex
    /// no longer exists (for instance, deleted after the input record
    /// was written).
    fn resolve_vertex(&self, vertex: VertexId) -> Result<Option<VertexId>>;
}

/// The administrative transaction handle one worker exclusively owns
/// for its whole lifetime.
pub trait AdminTx: VertexResolver {
    /// Looks up a graph-level index descriptor by name.
    fn graph_index(&self, name: &str) -> Result<Option<IndexDescriptor>>;

    /// Looks up an index scoped under a relation type. Returns
    /// `Err(UnknownRelationType)` when the relation type itself does
    /// not exist.
    fn relation_index(&self, relation_type: &str, name: &str)
        -> Result<Option<IndexDescriptor>>;

    /// Current lifecycle status of the named index's schema vertex.
    fn index_status(&self, name: &str) -> Result<SchemaStatus>;

    /// Current status of one indexed field key of a mixed index.
    fn field_status(&self, index: &str, field: &str) -> Result<SchemaStatus>;

    /// Adds adjacency entries under an element key. Additive only.
    fn mutate_adjacency(&mut self, key: ElementKey, additions: Vec<Entry>) -> Result<()>;

    /// Adds composite-index entries under an index key. Additive only.
    fn mutate_index(&mut self, key: ElementKey, additions: Vec<Entry>) -> Result<()>;

    /// Submits full-document upserts against the named backing search
    /// store's transaction handle.
    fn restore_documents(&mut self, backing_store: &str, docs: DocumentUpdates) -> Result<()>;

    /// Commits the transaction. Called exactly once, at teardown.
    fn commit(&mut self) -> Result<()>;

    /// Rolls the transaction back, discarding accumulated mutations.
    fn rollback(&mut self) -> Result<()>;
}

/// An open graph connection able to hand out administrative
/// transactions.
pub trait GraphEngine {
    /// Transaction handle type.
    type Tx: AdminTx;

    /// Opens the administrative transaction for one worker.
    fn open_admin_tx(&self) -> Result<Self::Tx>;

    /// Closes the connection. Called once, after commit, at teardown.
    fn close(&mut self) -> Result<()>;
}
