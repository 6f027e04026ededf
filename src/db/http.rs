//! SurrealDB HTTP client implementation.
//!
//! Provides the `SurrealHttpClient` struct that implements the `DatabaseClient`
//! trait on top of SurrealDB's `/sql` endpoint using reqwest.

use crate::config::ConnectionConfig;
use crate::db::{DatabaseClient, QueryParams, RawResult, STATUS_OK};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Timeout for establishing the TCP/TLS connection.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Statement used to verify credentials, namespace and database on connect.
const CONNECT_PROBE: &str = "INFO FOR DB;";

/// SurrealDB client speaking the HTTP query API.
#[derive(Debug)]
pub struct SurrealHttpClient {
    client: Client,
    sql_url: Url,
    username: Option<String>,
    password: Option<String>,
    closed: AtomicBool,
}

impl SurrealHttpClient {
    /// Creates a client from validated configuration without contacting the server.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let base = config.http_base_url()?;
        let sql_url = Url::parse(&format!("{}/sql", base.as_str().trim_end_matches('/')))
            .map_err(|e| BridgeError::config(format!("Invalid endpoint: {e}")))?;

        let namespace = config.namespace.as_deref().unwrap_or_default();
        let database = config.database.as_deref().unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in [
            ("surreal-ns", namespace),
            ("surreal-db", database),
            // Servers before 2.0 only read the short header names.
            ("ns", namespace),
            ("db", database),
        ] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| BridgeError::config(format!("Invalid value for {name}: {e}")))?;
            headers.insert(HeaderName::from_static(name), value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| BridgeError::connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            sql_url,
            username: config.username.clone(),
            password: config.password.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Creates a client and checks that the server accepts its credentials.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let client = Self::new(config)?;

        client
            .execute_query(CONNECT_PROBE, None)
            .await
            .map_err(|e| BridgeError::connection(format!("Unable to connect to database: {e}")))?;

        debug!("Sign-in check passed for {}", config.display_string());
        Ok(client)
    }

    /// Returns the query endpoint URL with parameters attached.
    fn request_url(&self, params: Option<&QueryParams>) -> Url {
        let mut url = self.sql_url.clone();
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            url.query_pairs_mut().extend_pairs(param_pairs(params));
        }
        url
    }
}

#[async_trait]
impl DatabaseClient for SurrealHttpClient {
    async fn execute_query(&self, sql: &str, params: Option<&QueryParams>) -> Result<RawResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::downstream("connection is closed"));
        }

        let start = Instant::now();
        let mut request = self
            .client
            .post(self.request_url(params))
            .body(sql.to_string());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                BridgeError::downstream(format!("Failed to connect to {}: {e}", self.sql_url))
            } else if e.is_timeout() {
                BridgeError::downstream("Request timed out")
            } else {
                BridgeError::downstream(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::downstream(format!("Failed to read response: {e}")))?;
        let execution_time = start.elapsed();

        if !status.is_success() {
            return Err(BridgeError::downstream(format!(
                "SurrealDB error ({}): {}",
                status,
                extract_error_message(&body)
            )));
        }

        let payload: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| BridgeError::plugin(format!("Failed to parse response: {e}")))?;

        if let Some(message) = first_statement_failure(&payload) {
            return Err(BridgeError::downstream(message));
        }

        debug!("Query answered in {:?}", execution_time);
        Ok(RawResult::new(payload).with_execution_time(execution_time))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Converts bound parameters into URL query pairs.
///
/// The HTTP API exposes each pair as a query variable; strings are sent
/// verbatim and everything else as JSON text.
fn param_pairs(params: &QueryParams) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

/// Pulls the most specific message out of an HTTP error body.
fn extract_error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    ["information", "description", "details"]
        .iter()
        .find_map(|key| json.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Returns the message of the first statement that did not succeed.
fn first_statement_failure(payload: &serde_json::Value) -> Option<String> {
    let statements = payload.as_array()?;

    statements.iter().find_map(|statement| {
        let status = statement.get("status")?.as_str()?;
        if status == STATUS_OK {
            return None;
        }
        let message = statement
            .get("detail")
            .and_then(|v| v.as_str())
            .or_else(|| statement.get("result").and_then(|v| v.as_str()))
            .unwrap_or(status);
        Some(message.to_string())
    })
}
