//! Worker configuration.
//!
//! The batch framework hands each worker a flat string parameter map;
//! the CLI driver reads the same shape from a TOML file. Either way the
//! index name is required and checked before any transaction opens.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RepairError, Result};

/// Parameter key carrying the name of the index under repair.
pub const PARAM_INDEX_NAME: &str = "index.name";
/// Parameter key carrying the optional owning relation-type name.
pub const PARAM_RELATION_TYPE: &str = "index.relation-type";

/// Configuration for one repair job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Name of the index under repair.
    pub index_name: String,
    /// Owning relation-type name; absent for graph-level indexes.
    #[serde(default)]
    pub relation_type: Option<String>,
    /// Backend connection parameters, carried for whichever caller
    /// opens the graph connection the worker runs against.
    #[serde(default)]
    pub backend: BTreeMap<String, String>,
}

impl RepairConfig {
    /// Configuration for a graph-level index.
    pub fn graph_index(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            relation_type: None,
            backend: BTreeMap::new(),
        }
    }

    /// Configuration for an index scoped under a relation type.
    pub fn relation_index(
        index_name: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            relation_type: Some(relation_type.into()),
            backend: BTreeMap::new(),
        }
    }

    /// Builds a configuration from the framework's flat parameter map.
    ///
    /// [`PARAM_INDEX_NAME`] is required; [`PARAM_RELATION_TYPE`] is
    /// optional; every other entry is treated as a backend connection
    /// parameter.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self> {
        let index_name = params
            .get(PARAM_INDEX_NAME)
            .cloned()
            .ok_or_else(|| RepairError::Config(format!("missing parameter {PARAM_INDEX_NAME}")))?;
        let relation_type = params.get(PARAM_RELATION_TYPE).cloned();
        let backend = params
            .iter()
            .filter(|(k, _)| k.as_str() != PARAM_INDEX_NAME && k.as_str() != PARAM_RELATION_TYPE)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let config = Self {
            index_name,
            relation_type,
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the index name is present and non-blank.
    pub fn validate(&self) -> Result<()> {
        if self.index_name.trim().is_empty() {
            return Err(RepairError::Config(
                "an index name is required for a repair job".to_string(),
            ));
        }
        if let Some(relation_type) = &self.relation_type {
            if relation_type.trim().is_empty() {
                return Err(RepairError::Config(
                    "relation-type name must be non-blank when provided".to_string(),
                ));
            }
        }
        Ok(())
    }
}
