//! Mock database clients for testing.
//!
//! `MockDatabaseClient` answers queries from a script of canned responses,
//! optionally after a delay, and counts how many calls started and finished.

use super::{DatabaseClient, QueryParams, RawResult};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Handler = dyn Fn(&str, Option<&QueryParams>) -> Result<RawResult> + Send + Sync;

/// Canned reply for one query text.
#[derive(Debug, Clone)]
enum Scripted {
    Payload(serde_json::Value),
    Failure(String),
}

/// A mock database client that returns predefined results.
///
/// Queries without a scripted reply get an empty `OK` statement.
pub struct MockDatabaseClient {
    responses: Mutex<HashMap<String, Scripted>>,
    handler: Option<Box<Handler>>,
    delay: Option<Duration>,
    started: AtomicUsize,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no scripted replies.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            handler: None,
            delay: None,
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a mock that answers every query through the given closure.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&str, Option<&QueryParams>) -> Result<RawResult> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::new()
        }
    }

    /// Makes every call wait before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Scripts the raw payload returned for a query text.
    pub fn on_query(self, sql: impl Into<String>, payload: serde_json::Value) -> Self {
        self.script(sql.into(), Scripted::Payload(payload));
        self
    }

    /// Scripts a downstream failure for a query text.
    pub fn on_query_fail(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.script(sql.into(), Scripted::Failure(message.into()));
        self
    }

    /// Scripts a single successful statement returning the given rows.
    pub fn on_query_rows(self, sql: impl Into<String>, rows: serde_json::Value) -> Self {
        self.on_query(sql, ok_statement(rows))
    }

    fn script(&self, sql: String, reply: Scripted) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(sql, reply);
        }
    }

    /// Number of calls that reached the client.
    pub fn calls_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of calls that ran to completion (not aborted).
    pub fn calls_finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn answer(&self, sql: &str, params: Option<&QueryParams>) -> Result<RawResult> {
        if let Some(handler) = &self.handler {
            return handler(sql, params);
        }

        let scripted = self
            .responses
            .lock()
            .map_err(|_| BridgeError::plugin("mock response table poisoned"))?
            .get(sql)
            .cloned();

        match scripted {
            Some(Scripted::Payload(payload)) => Ok(RawResult::new(payload)),
            Some(Scripted::Failure(message)) => Err(BridgeError::downstream(message)),
            None => Ok(RawResult::new(ok_statement(json!([])))),
        }
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds one slot of the in-flight counter; released on drop so aborted
/// calls are not counted as still running.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
    count: usize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, count }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builds a single-statement `OK` envelope around the given result.
pub fn ok_statement(result: serde_json::Value) -> serde_json::Value {
    json!([{ "status": "OK", "time": "1.2ms", "result": result }])
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str, params: Option<&QueryParams>) -> Result<RawResult> {
        self.started.fetch_add(1, Ordering::SeqCst);

        if self.is_closed() {
            return Err(BridgeError::downstream("connection is closed"));
        }

        let running = InFlight::enter(&self.in_flight);
        self.peak_in_flight.fetch_max(running.count, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = self.answer(sql, params);
        drop(running);
        self.finished.fetch_add(1, Ordering::SeqCst);
        result.map(|raw| raw.with_execution_time(self.delay.unwrap_or(Duration::ZERO)))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A database client whose every call fails with a downstream error.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client that fails with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(&self, _sql: &str, _params: Option<&QueryParams>) -> Result<RawResult> {
        Err(BridgeError::downstream(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
