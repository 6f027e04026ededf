//! Tests against a running SurrealDB server.
//!
//! Set SURREAL_TEST_ENDPOINT (and optionally SURREAL_TEST_USER,
//! SURREAL_TEST_PASS) to run them, e.g.:
//!
//! ```text
//! surreal start --user root --pass root memory
//! SURREAL_TEST_ENDPOINT=http://localhost:8000 cargo test --test integration_tests
//! ```

use serde_json::json;
use surreal_bridge::config::{Config, ConnectionConfig};
use surreal_bridge::connection::QueryContext;
use surreal_bridge::datasource::Datasource;
use surreal_bridge::db::{DatabaseClient, SurrealHttpClient};
use surreal_bridge::error::{BridgeError, ErrorSource};
use surreal_bridge::query::{DataQuery, QueryDataRequest};

/// Helper to build a test config from the environment.
fn get_test_config() -> Option<Config> {
    let endpoint = std::env::var("SURREAL_TEST_ENDPOINT").ok()?;
    Some(Config {
        connection: ConnectionConfig {
            endpoint: Some(endpoint),
            namespace: Some("bridge_test".to_string()),
            database: Some("bridge_test".to_string()),
            username: Some(std::env::var("SURREAL_TEST_USER").unwrap_or_else(|_| "root".into())),
            password: Some(std::env::var("SURREAL_TEST_PASS").unwrap_or_else(|_| "root".into())),
        },
        ..Default::default()
    })
}

#[tokio::test]
async fn test_connect_and_check_health() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: SURREAL_TEST_ENDPOINT not set");
        return;
    };

    let ds = Datasource::connect(&config).await.unwrap();
    let health = ds.check_health().await;
    assert!(health.is_ok(), "{}", health.message);
    ds.dispose().await.unwrap();
}

#[tokio::test]
async fn test_live_batch() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: SURREAL_TEST_ENDPOINT not set");
        return;
    };

    let client = SurrealHttpClient::connect(&config.connection).await.unwrap();
    client
        .execute_query(
            "DELETE person; CREATE person:1 SET name = 'Tobie'; CREATE person:2 SET name = 'Jaime';",
            None,
        )
        .await
        .unwrap();

    let ds = Datasource::connect(&config).await.unwrap();
    let batch = ds
        .query_data(
            &QueryContext::background(),
            QueryDataRequest {
                queries: vec![
                    DataQuery::new("A", json!({ "queryText": "SELECT id, name FROM person ORDER BY id" })),
                    DataQuery::new("B", json!({ "queryText": "SELECT * FROM does_not_exist WHERE (" })),
                ],
            },
        )
        .await;

    let table = batch.get("A").unwrap().table().unwrap();
    assert_eq!(table.column("id").unwrap().len(), 2);
    assert_eq!(table.column("name").unwrap().len(), 2);

    let error = batch.get("B").unwrap().error.as_ref().unwrap();
    assert_eq!(error.source, ErrorSource::Downstream);

    ds.dispose().await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_unreachable_host() {
    let config = ConnectionConfig {
        endpoint: Some("http://invalid.host.that.does.not.exist.local:8000".to_string()),
        namespace: Some("test".to_string()),
        database: Some("test".to_string()),
        username: None,
        password: None,
    };

    let err = SurrealHttpClient::connect(&config).await.err().unwrap();
    assert!(matches!(err, BridgeError::Connection(_)), "got {err:?}");
}
