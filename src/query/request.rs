//! Decoding of host query models into executable requests.

use serde::{Deserialize, Serialize};

use super::macros::{expand_macros, MacroContext, TimeRange};
use crate::db::QueryParams;
use crate::error::{BridgeError, Result};

/// One query as submitted by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    /// Caller-assigned identifier, unique within a batch.
    pub ref_id: String,

    /// Opaque query model, either a JSON object or JSON text.
    #[serde(default)]
    pub json: serde_json::Value,

    /// Dashboard time range, used by time macros.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,

    /// Suggested grouping interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,

    /// Maximum number of points the caller wants back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_data_points: Option<u64>,
}

impl DataQuery {
    /// Creates a query with the given identifier and model.
    pub fn new(ref_id: impl Into<String>, json: serde_json::Value) -> Self {
        Self {
            ref_id: ref_id.into(),
            json,
            time_range: None,
            interval_ms: None,
            max_data_points: None,
        }
    }

    /// Sets the time range.
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    fn macro_context(&self) -> MacroContext {
        MacroContext {
            time_range: self.time_range.clone(),
            interval_ms: self.interval_ms,
            max_data_points: self.max_data_points,
        }
    }
}

/// A batch of queries as submitted by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

/// The query model carried in `DataQuery::json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryModel {
    #[serde(default, alias = "rawSql")]
    query_text: Option<String>,

    #[serde(default, alias = "vars")]
    params: Option<QueryParams>,
}

/// A decoded, macro-expanded query ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Request identifier.
    pub ref_id: String,

    /// Query text with macros expanded.
    pub query_text: String,

    /// Bound parameters, if any.
    pub params: Option<QueryParams>,
}

impl QueryRequest {
    /// Decodes a host query into an executable request.
    ///
    /// Every failure here is the caller's fault and becomes a bad request.
    pub fn from_data_query(query: &DataQuery) -> Result<Self> {
        let model = decode_model(&query.json)?;

        let text = model
            .query_text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BridgeError::bad_request("query text is empty"))?;

        let query_text = expand_macros(&text, &query.macro_context())?;

        Ok(Self {
            ref_id: query.ref_id.clone(),
            query_text,
            params: model.params.filter(|p| !p.is_empty()),
        })
    }
}

fn decode_model(json: &serde_json::Value) -> Result<QueryModel> {
    let decoded = match json {
        serde_json::Value::String(text) => serde_json::from_str(text),
        other => serde_json::from_value(other.clone()),
    };
    decoded.map_err(|e| BridgeError::bad_request(format!("cannot decode query model: {e}")))
}
