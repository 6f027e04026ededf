//! Cancellation and timeout integration tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use surreal_bridge::config::QueryConfig;
use surreal_bridge::connection::QueryContext;
use surreal_bridge::datasource::Datasource;
use surreal_bridge::db::{ok_statement, MockDatabaseClient, RawResult};
use surreal_bridge::error::{ErrorSource, ResponseStatus};
use surreal_bridge::query::{DataQuery, QueryDataRequest};
use tokio_util::sync::CancellationToken;

fn query(ref_id: &str, sql: &str) -> DataQuery {
    DataQuery::new(ref_id, json!({ "queryText": sql }))
}

/// Answers every query, but only after a long stall.
fn slow_server() -> MockDatabaseClient {
    MockDatabaseClient::with_handler(|_, _| Ok(RawResult::new(ok_statement(json!([{ "v": 1 }])))))
        .with_delay(Duration::from_secs(30))
}

#[tokio::test]
async fn test_cancel_before_completion_fails_every_query() {
    let client = Arc::new(slow_server());
    let ds = Datasource::with_client(client.clone(), &QueryConfig::default());

    let token = CancellationToken::new();
    let ctx = QueryContext::new(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let started = Instant::now();
    let batch = ds
        .query_data(
            &ctx,
            QueryDataRequest {
                queries: vec![query("A", "SELECT 1"), query("B", "SELECT 2"), query("C", "SELECT 3")],
            },
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(batch.len(), 3);
    for (ref_id, response) in &batch.responses {
        let error = response.error.as_ref().unwrap();
        assert_eq!(error.status, ResponseStatus::Cancelled, "query {ref_id}");
        assert_eq!(error.source, ErrorSource::Downstream);
    }

    // Losing calls are aborted, not left running.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.calls_finished(), 0);
}

#[tokio::test]
async fn test_already_cancelled_batch_still_answers_every_query() {
    let ds = Datasource::with_client(Arc::new(MockDatabaseClient::new()), &QueryConfig::default());
    let ctx = QueryContext::background();
    ctx.cancel();

    let batch = ds
        .query_data(
            &ctx,
            QueryDataRequest {
                queries: vec![query("A", "SELECT 1"), DataQuery::new("B", json!(7))],
            },
        )
        .await;

    assert_eq!(batch.len(), 2);
    assert_eq!(
        batch.get("A").unwrap().error.as_ref().unwrap().status,
        ResponseStatus::Cancelled
    );
    // Decoding happens before execution, so a malformed model is still a caller error.
    assert_eq!(
        batch.get("B").unwrap().error.as_ref().unwrap().source,
        ErrorSource::Caller
    );
}

#[tokio::test]
async fn test_query_timeout_from_config() {
    let config = QueryConfig {
        timeout_secs: 1,
        ..QueryConfig::default()
    };
    let ds = Datasource::with_client(Arc::new(slow_server()), &config);

    let started = Instant::now();
    let batch = ds
        .query_data(
            &QueryContext::background(),
            QueryDataRequest {
                queries: vec![query("A", "SELECT 1")],
            },
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    let error = batch.get("A").unwrap().error.as_ref().unwrap();
    assert_eq!(error.status, ResponseStatus::Timeout);
    assert_eq!(error.message, "Query timed out after 1 seconds");
}

#[tokio::test]
async fn test_batch_deadline_leaves_fast_queries_alone() {
    let client = MockDatabaseClient::with_handler(|sql, _| {
        Ok(RawResult::new(ok_statement(json!([{ "sql": sql }]))))
    });
    let ds = Datasource::with_client(Arc::new(client), &QueryConfig::default());

    let ctx = QueryContext::background().with_timeout(Duration::from_secs(10));
    let batch = ds
        .query_data(
            &ctx,
            QueryDataRequest {
                queries: vec![query("A", "SELECT 1"), query("B", "SELECT 2")],
            },
        )
        .await;

    assert!(batch.all_ok());
}

#[tokio::test]
async fn test_abandoned_batch_stops_running_queries() {
    let client = Arc::new(
        MockDatabaseClient::new().with_delay(Duration::from_millis(200)),
    );
    let ds = Datasource::with_client(client.clone(), &QueryConfig::default());

    let outcome = tokio::time::timeout(
        Duration::from_millis(20),
        ds.query_data(
            &QueryContext::background(),
            QueryDataRequest {
                queries: vec![query("A", "SELECT 1"), query("B", "SELECT 2"), query("C", "SELECT 3")],
            },
        ),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.calls_started(), 3);
    assert_eq!(client.calls_finished(), 0);
}
