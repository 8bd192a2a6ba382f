//! Index descriptors and the status state machine that gates repair.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::AdminTx;
use crate::error::{RepairError, Result};
use crate::types::{Direction, ElementKind, SchemaStatus};

/// Identifies the index under repair.
///
/// One closed sum type with three cases, each carrying only the fields
/// relevant to it; the mutation builder dispatches on it once per
/// record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IndexDescriptor {
    /// Adjacency-keyed index over one relation type.
    RelationType {
        /// Index name.
        name: String,
        /// The relation type whose adjacency list is indexed.
        relation_type: String,
        /// Which endpoint directions the index configuration covers.
        covered: Direction,
    },
    /// Exact-match index keyed by a combination of field values.
    Composite {
        /// Index name.
        name: String,
        /// Kind of element the index ranges over.
        element: ElementKind,
        /// Indexed field keys; all must be present on an element for
        /// it to produce an entry.
        fields: Vec<String>,
    },
    /// Document-oriented index backed by an external search store.
    Mixed {
        /// Index name.
        name: String,
        /// Kind of element the index ranges over.
        element: ElementKind,
        /// Indexed field keys.
        fields: Vec<String>,
        /// Name of the backing search store.
        backing_store: String,
    },
}

impl IndexDescriptor {
    /// Name of the index.
    pub fn name(&self) -> &str {
        match self {
            IndexDescriptor::RelationType { name, .. }
            | IndexDescriptor::Composite { name, .. }
            | IndexDescriptor::Mixed { name, .. } => name,
        }
    }
}

/// A descriptor that passed status validation, with any mixed-index
/// field keys in `DISABLED` status already filtered out.
///
/// Fetched once at worker setup and read-only afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedIndex {
    descriptor: IndexDescriptor,
}

impl ValidatedIndex {
    /// The validated descriptor.
    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    /// Name of the index.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// Resolves the configured index into a descriptor through the admin
/// transaction's schema lookup.
///
/// With an owning relation-type name the lookup is scoped under that
/// type, and the result must be a relation-type index; a graph-level
/// lookup must not yield one. Either mismatch is a configuration or
/// schema defect, reported as `UnsupportedIndexKind`.
pub fn resolve_descriptor(
    tx: &impl AdminTx,
    index_name: &str,
    relation_type: Option<&str>,
) -> Result<IndexDescriptor> {
    let descriptor = match relation_type {
        Some(rel_type) => tx
            .relation_index(rel_type, index_name)?
            .ok_or_else(|| RepairError::UnknownIndex(index_name.to_string()))?,
        None => tx
            .graph_index(index_name)?
            .ok_or_else(|| RepairError::UnknownIndex(index_name.to_string()))?,
    };

    let scoped = matches!(descriptor, IndexDescriptor::RelationType { .. });
    if scoped != relation_type.is_some() {
        return Err(RepairError::UnsupportedIndexKind(index_name.to_string()));
    }
    info!(index = %index_name, "repair.validate.found_index");
    Ok(descriptor)
}

/// Checks that the index is in a status from which repair is legal.
///
/// Relation-type and composite indexes must be `REGISTERED` or
/// `ENABLED`. For a mixed index each field key is examined
/// individually: `DISABLED` keys are logged and excluded from later
/// mutation, any other non-repairable status fails the worker.
///
/// Runs exactly once, at worker setup, inside the administrative
/// transaction.
pub fn validate_index_status(
    tx: &impl AdminTx,
    descriptor: &IndexDescriptor,
) -> Result<ValidatedIndex> {
    let validated = match descriptor {
        IndexDescriptor::RelationType { name, .. } | IndexDescriptor::Composite { name, .. } => {
            let status = tx.index_status(name)?;
            if !status.is_repairable() {
                return Err(RepairError::InvalidIndexState {
                    index: name.clone(),
                    status,
                });
            }
            descriptor.clone()
        }
        IndexDescriptor::Mixed {
            name,
            element,
            fields,
            backing_store,
        } => {
            let mut live_fields = Vec::with_capacity(fields.len());
            for field in fields {
                let status = tx.field_status(name, field)?;
                if status == SchemaStatus::Disabled {
                    warn!(
                        index = %name,
                        field = %field,
                        "repair.validate.disabled_field_excluded"
                    );
                    continue;
                }
                if !status.is_repairable() {
                    warn!(
                        index = %name,
                        field = %field,
                        status = %status,
                        "repair.validate.invalid_field_status"
                    );
                    return Err(RepairError::InvalidIndexState {
                        index: name.clone(),
                        status,
                    });
                }
                live_fields.push(field.clone());
            }
            IndexDescriptor::Mixed {
                name: name.clone(),
                element: *element,
                fields: live_fields,
                backing_store: backing_store.clone(),
            }
        }
    };

    info!(index = %validated.name(), "repair.validate.ok");
    Ok(ValidatedIndex {
        descriptor: validated,
    })
}
