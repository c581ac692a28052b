//! Wire format for rule mutation requests

use fh_core::NewRule;
use serde::{Deserialize, Serialize};

/// Body of `POST {base_uri}/rules`.
///
/// Serializes as `{"add": [...]}` or `{"delete": {"ids": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesRequest {
    /// Create rules
    Add(Vec<NewRule>),

    /// Delete rules by id
    Delete(DeleteIds),
}

/// Id list of a delete request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteIds {
    pub ids: Vec<String>,
}

impl RulesRequest {
    /// Create request
    pub fn add(rules: Vec<NewRule>) -> Self {
        Self::Add(rules)
    }

    /// Delete request
    pub fn delete(ids: Vec<String>) -> Self {
        Self::Delete(DeleteIds { ids })
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Delete(_) => "delete",
        }
    }
}
