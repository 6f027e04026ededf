//! Per-query and per-batch responses returned to the host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Table;
use crate::error::{BridgeError, ErrorSource, ResponseStatus};

/// Error details attached to a failed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryError {
    /// Human-readable message.
    pub message: String,

    /// Status for the host to report.
    pub status: ResponseStatus,

    /// Party the failure is attributed to.
    pub source: ErrorSource,
}

impl From<&BridgeError> for QueryError {
    fn from(err: &BridgeError) -> Self {
        Self {
            message: err.to_string(),
            status: err.status(),
            source: err.source_kind(),
        }
    }
}

/// The answer to one query: either tables or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    /// Result tables; empty when the query failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<Table>,

    /// Failure details, if the query failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryError>,
}

impl DataResponse {
    /// Creates a successful response holding one table.
    pub fn from_table(table: Table) -> Self {
        Self {
            frames: vec![table],
            error: None,
        }
    }

    /// Creates a failed response from an error.
    pub fn from_error(err: &BridgeError) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(QueryError::from(err)),
        }
    }

    /// Returns true if the query succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the result table of a successful query.
    pub fn table(&self) -> Option<&Table> {
        self.frames.first()
    }
}

/// Responses for a whole batch, keyed by request identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    /// One entry per submitted request.
    pub responses: BTreeMap<String, DataResponse>,
}

impl BatchResponse {
    /// Creates an empty batch response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the response for a request. Returns false if the identifier
    /// already had a response, which is left untouched.
    pub fn insert(&mut self, ref_id: impl Into<String>, response: DataResponse) -> bool {
        match self.responses.entry(ref_id.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(response);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Returns the response for a request identifier.
    pub fn get(&self, ref_id: &str) -> Option<&DataResponse> {
        self.responses.get(ref_id)
    }

    /// Number of responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns true if there are no responses.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Number of failed responses.
    pub fn failed_count(&self) -> usize {
        self.responses.values().filter(|r| !r.is_ok()).count()
    }

    /// Returns true if every query succeeded.
    pub fn all_ok(&self) -> bool {
        self.failed_count() == 0
    }
}
