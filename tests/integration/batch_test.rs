//! Batch query integration tests.
//!
//! Runs whole batches through the data source facade and checks the keyed
//! responses the host would receive.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use surreal_bridge::config::QueryConfig;
use surreal_bridge::connection::QueryContext;
use surreal_bridge::datasource::Datasource;
use surreal_bridge::db::{ok_statement, MockDatabaseClient, RawResult, Value};
use surreal_bridge::error::{BridgeError, ErrorSource, ResponseStatus};
use surreal_bridge::query::{DataQuery, QueryDataRequest, TimeRange};

/// A server with a `person` table holding two records.
fn person_server() -> MockDatabaseClient {
    MockDatabaseClient::with_handler(|sql, _params| match sql {
        "SELECT * FROM person" => Ok(RawResult::new(ok_statement(json!([
            { "id": "person:1", "name": "Tobie" },
            { "id": "person:2", "name": "Jaime" }
        ])))),
        "SELECT * FROM does_not_exist" => Err(BridgeError::downstream(
            "The table 'does_not_exist' does not exist",
        )),
        _ => Ok(RawResult::new(ok_statement(json!([])))),
    })
}

fn datasource(client: MockDatabaseClient) -> Datasource {
    Datasource::with_client(Arc::new(client), &QueryConfig::default())
}

fn batch_request(value: serde_json::Value) -> QueryDataRequest {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_mixed_batch_isolates_failures() {
    let ds = datasource(person_server());
    let request = batch_request(json!({
        "queries": [
            { "refId": "A", "json": { "queryText": "SELECT * FROM person" } },
            { "refId": "B", "json": { "queryText": "SELECT * FROM does_not_exist" } },
            { "refId": "C", "json": "{ this is not json" }
        ]
    }));

    let batch = ds.query_data(&QueryContext::background(), request).await;

    assert_eq!(batch.len(), 3);

    let table = batch.get("A").unwrap().table().unwrap();
    assert_eq!(table.column_names(), vec!["id", "name"]);
    assert_eq!(table.column("id").unwrap().len(), 2);
    assert_eq!(
        table.column("name").unwrap().values,
        vec![Value::from("Tobie"), Value::from("Jaime")]
    );

    let missing = batch.get("B").unwrap().error.as_ref().unwrap();
    assert_eq!(missing.source, ErrorSource::Downstream);
    assert!(missing.message.contains("does_not_exist"));

    let malformed = batch.get("C").unwrap().error.as_ref().unwrap();
    assert_eq!(malformed.source, ErrorSource::Caller);
    assert_eq!(malformed.status, ResponseStatus::BadRequest);
}

#[tokio::test]
async fn test_batch_serializes_for_host() {
    let ds = datasource(person_server());
    let request = batch_request(json!({
        "queries": [
            { "refId": "A", "json": { "queryText": "SELECT * FROM person" } },
            { "refId": "B", "json": {} }
        ]
    }));

    let batch = ds.query_data(&QueryContext::background(), request).await;
    let json = serde_json::to_value(&batch).unwrap();

    assert_eq!(
        json,
        json!({
            "responses": {
                "A": {
                    "frames": [{
                        "name": "response",
                        "columns": [
                            { "name": "id", "values": ["person:1", "person:2"] },
                            { "name": "name", "values": ["Tobie", "Jaime"] }
                        ]
                    }]
                },
                "B": {
                    "error": {
                        "message": "Invalid query: query text is empty",
                        "status": "bad_request",
                        "source": "caller"
                    }
                }
            }
        })
    );
}

#[tokio::test]
async fn test_params_and_macros_reach_the_client() {
    let client = MockDatabaseClient::with_handler(|sql, params| {
        let age = params
            .and_then(|p| p.get("age"))
            .cloned()
            .unwrap_or(json!(null));
        Ok(RawResult::new(ok_statement(json!([{ "sql": sql, "age": age }]))))
    });
    let ds = datasource(client);

    let query = DataQuery::new(
        "A",
        json!({
            "queryText": "SELECT * FROM reading WHERE age > $age AND $__timeFilter(at)",
            "params": { "age": 30 }
        }),
    )
    .with_time_range(TimeRange::new("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"));

    let batch = ds
        .query_data(
            &QueryContext::background(),
            QueryDataRequest {
                queries: vec![query],
            },
        )
        .await;

    let table = batch.get("A").unwrap().table().unwrap();
    assert_eq!(
        table.column("sql").unwrap().values[0],
        Value::from(
            "SELECT * FROM reading WHERE age > $age AND at >= <datetime>'2024-01-01T00:00:00Z' \
             AND at <= <datetime>'2024-01-02T00:00:00Z'"
        )
    );
    assert_eq!(table.column("age").unwrap().values[0], Value::Int(30));
}

#[tokio::test]
async fn test_unexpected_payload_is_plugin_error() {
    let client = MockDatabaseClient::new().on_query("SELECT 1", json!({ "unexpected": true }));
    let ds = datasource(client);

    let batch = ds
        .query_data(
            &QueryContext::background(),
            QueryDataRequest {
                queries: vec![DataQuery::new("A", json!({ "queryText": "SELECT 1" }))],
            },
        )
        .await;

    let error = batch.get("A").unwrap().error.as_ref().unwrap();
    assert_eq!(error.source, ErrorSource::Plugin);
    assert_eq!(error.status, ResponseStatus::Internal);
}

#[tokio::test]
async fn test_concurrent_calls_are_bounded() {
    let client = Arc::new(MockDatabaseClient::new().with_delay(std::time::Duration::from_millis(30)));
    let config = QueryConfig {
        max_concurrent_queries: 2,
        ..QueryConfig::default()
    };
    let ds = Datasource::with_client(client.clone(), &config);

    let queries = (0..8)
        .map(|i| DataQuery::new(format!("Q{i}"), json!({ "queryText": "SELECT 1" })))
        .collect();
    let batch = ds
        .query_data(&QueryContext::background(), QueryDataRequest { queries })
        .await;

    assert_eq!(batch.len(), 8);
    assert!(batch.all_ok());
    assert_eq!(client.calls_finished(), 8);
    assert!(client.peak_in_flight() <= 2);
}
