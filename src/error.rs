//! Error taxonomy for the repair worker.

use thiserror::Error;

use crate::types::SchemaStatus;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RepairError>;

/// Errors surfaced by the index-repair engine.
///
/// Every variant except the unresolved-endpoint case (which is handled
/// internally by skipping the relation) is fatal for the worker that
/// raised it: the administrative transaction is rolled back and the
/// failure propagates to the enclosing batch framework, which owns any
/// partition-level retry.
#[derive(Debug, Error)]
pub enum RepairError {
    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
    /// The named index does not exist in the schema.
    #[error("index not found: {0}")]
    UnknownIndex(String),
    /// The configured owning relation type does not exist in the schema.
    #[error("relation type not found: {0}")]
    UnknownRelationType(String),
    /// The index (or one of its field keys) is in a status that
    /// disallows repair.
    #[error("index {index} is in invalid state {status} and cannot be repaired")]
    InvalidIndexState {
        /// Name of the index under repair.
        index: String,
        /// The offending status.
        status: SchemaStatus,
    },
    /// The resolved descriptor kind cannot legally occupy its
    /// configured position (a configuration or schema defect).
    #[error("unsupported index kind for {0}")]
    UnsupportedIndexKind(String),
    /// The storage or search backend rejected an operation.
    #[error("backend error: {0}")]
    Backend(String),
    /// A lifecycle hook was invoked out of order.
    #[error("worker is not in a usable state: {0}")]
    WorkerState(&'static str),
    /// I/O error from the driver's file handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse a configuration or snapshot file.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for RepairError {
    fn from(err: toml::de::Error) -> Self {
        RepairError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for RepairError {
    fn from(err: serde_json::Error) -> Self {
        RepairError::Parse(err.to_string())
    }
}
