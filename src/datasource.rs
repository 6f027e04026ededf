//! The data source facade used by hosts.
//!
//! A `Datasource` owns one connection for its whole lifetime. Settings are
//! validated once in [`Datasource::connect`]; queries only ever see an
//! already working client.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{Config, QueryConfig};
use crate::connection::{Connection, QueryContext};
use crate::db::{self, DatabaseClient};
use crate::error::Result;
use crate::health::{self, HealthCheckResult};
use crate::query::{BatchResponse, Dispatcher, QueryDataRequest};

/// A configured SurrealDB data source.
pub struct Datasource {
    connection: Arc<Connection>,
    dispatcher: Dispatcher,
}

impl Datasource {
    /// Validates the configuration and connects to the server.
    ///
    /// The password must already be resolved into `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.connection.validate()?;
        info!("Connecting to {}", config.connection.display_string());

        let client = db::connect(&config.connection).await?;
        info!("Connected to {}", config.connection.display_string());
        Ok(Self::with_client(client, &config.query))
    }

    /// Builds a data source over an existing client.
    pub fn with_client(client: Arc<dyn DatabaseClient>, config: &QueryConfig) -> Self {
        let connection = Arc::new(
            Connection::new(client, config.max_concurrent_queries)
                .with_query_timeout(config.timeout()),
        );
        let dispatcher = Dispatcher::new(Arc::clone(&connection));
        Self {
            connection,
            dispatcher,
        }
    }

    /// Runs a batch of queries. Always returns one response per distinct
    /// request identifier, even when `ctx` is cancelled.
    pub async fn query_data(&self, ctx: &QueryContext, request: QueryDataRequest) -> BatchResponse {
        debug!("Received batch of {} queries", request.queries.len());
        self.dispatcher.dispatch(ctx, request.queries).await
    }

    /// Checks that the server accepts queries.
    pub async fn check_health(&self) -> HealthCheckResult {
        health::check_health(&self.connection, None).await
    }

    /// Releases the connection. Later queries fail as downstream errors.
    pub async fn dispose(&self) -> Result<()> {
        info!("Disposing data source");
        self.connection.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::db::MockDatabaseClient;
    use crate::error::{BridgeError, ErrorSource};
    use crate::query::DataQuery;
    use serde_json::json;

    fn datasource(mock: MockDatabaseClient) -> Datasource {
        Datasource::with_client(Arc::new(mock), &QueryConfig::default())
    }

    fn request(queries: Vec<DataQuery>) -> QueryDataRequest {
        QueryDataRequest { queries }
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = Config {
            connection: ConnectionConfig {
                endpoint: Some("ftp://localhost".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = Datasource::connect(&config).await.err().unwrap();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[tokio::test]
    async fn test_query_data() {
        let ds = datasource(MockDatabaseClient::new().on_query_rows(
            "SELECT * FROM person",
            json!([{ "id": "person:1", "name": "Tobie" }]),
        ));

        let batch = ds
            .query_data(
                &QueryContext::background(),
                request(vec![DataQuery::new(
                    "A",
                    json!({ "queryText": "SELECT * FROM person" }),
                )]),
            )
            .await;

        let table = batch.get("A").unwrap().table().unwrap();
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.row_count(), 1);
    }

    #[tokio::test]
    async fn test_check_health() {
        let ds = datasource(MockDatabaseClient::new());
        assert!(ds.check_health().await.is_ok());
    }

    #[tokio::test]
    async fn test_queries_after_dispose_fail_downstream() {
        let ds = datasource(MockDatabaseClient::new());
        ds.dispose().await.unwrap();

        let batch = ds
            .query_data(
                &QueryContext::background(),
                request(vec![DataQuery::new("A", json!({ "queryText": "SELECT 1" }))]),
            )
            .await;

        let error = batch.get("A").unwrap().error.as_ref().unwrap();
        assert_eq!(error.source, ErrorSource::Downstream);
        assert!(!ds.check_health().await.is_ok());
    }
}
