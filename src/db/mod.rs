//! Database abstraction layer for surreal-bridge.
//!
//! Provides a trait-based interface over the wire client so the query engine
//! can run against the real HTTP client or an in-memory mock.

mod http;
mod mock;
mod types;

pub use http::SurrealHttpClient;
pub use mock::{ok_statement, FailingDatabaseClient, MockDatabaseClient};
pub use types::{QueryParams, RawResult, Value, STATUS_OK};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Creates a database client for the given configuration.
///
/// This is the central factory function for database connections. The
/// returned client is meant to live as long as the data source that owns it.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn DatabaseClient>> {
    let client = SurrealHttpClient::connect(config).await?;
    Ok(Arc::new(client))
}

/// Trait defining the interface for database clients.
///
/// Implementations must be safe to share between concurrently running queries.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a query with optional bound parameters and returns the raw payload.
    ///
    /// Any failure reported by the database is returned as a downstream error.
    async fn execute_query(&self, sql: &str, params: Option<&QueryParams>) -> Result<RawResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}
