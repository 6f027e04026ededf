//! Concurrent fan-out of a query batch.
//!
//! Each query in a batch runs as its own task: decode, execute through the
//! shared [`Connection`], normalize. The dispatcher waits for every task and
//! always returns one response per distinct request identifier. Failures are
//! recorded in that request's slot and never abort the rest of the batch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, warn};

use super::{normalize, BatchResponse, DataQuery, DataResponse, QueryRequest, Table};
use crate::connection::{Connection, QueryContext};
use crate::error::{BridgeError, Result};

/// Runs batches of queries against one connection.
pub struct Dispatcher {
    connection: Arc<Connection>,
}

impl Dispatcher {
    /// Creates a dispatcher. Per-query timeouts are applied by the
    /// connection on top of whatever deadline the batch context carries.
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    /// Executes every query in the batch and returns all responses.
    ///
    /// Cancelling `ctx` makes every pending query finish with a cancellation
    /// error. Dropping the returned future aborts every query still running.
    /// Identifiers are expected to be unique; when one repeats, only its
    /// first query runs.
    pub async fn dispatch(&self, ctx: &QueryContext, queries: Vec<DataQuery>) -> BatchResponse {
        let start = Instant::now();
        let mut seen = HashSet::with_capacity(queries.len());
        let mut ref_ids = Vec::with_capacity(queries.len());
        let mut tasks = Vec::with_capacity(queries.len());

        for query in queries {
            if !seen.insert(query.ref_id.clone()) {
                warn!("Duplicate refId '{}' in batch, skipping", query.ref_id);
                continue;
            }

            let connection = Arc::clone(&self.connection);
            let query_ctx = ctx.child();
            ref_ids.push(query.ref_id.clone());
            tasks.push(AbortOnDropHandle::new(tokio::spawn(async move {
                execute_query(&connection, &query_ctx, &query).await
            })));
        }

        let outcomes = futures::future::join_all(tasks).await;

        let mut batch = BatchResponse::new();
        for (ref_id, outcome) in ref_ids.into_iter().zip(outcomes) {
            let response = outcome.unwrap_or_else(|e| {
                error!("Query task for '{}' failed: {}", ref_id, e);
                DataResponse::from_error(&BridgeError::plugin(format!("query task failed: {e}")))
            });
            batch.insert(ref_id, response);
        }

        debug!(
            "Batch of {} queries finished in {:?} ({} failed)",
            batch.len(),
            start.elapsed(),
            batch.failed_count()
        );
        batch
    }
}

/// Runs one query to completion, turning any failure into an error response.
pub async fn execute_query(
    connection: &Connection,
    ctx: &QueryContext,
    query: &DataQuery,
) -> DataResponse {
    match run_query(connection, ctx, query).await {
        Ok(table) => {
            debug!(
                "Query '{}' returned {} columns",
                query.ref_id,
                table.columns.len()
            );
            DataResponse::from_table(table)
        }
        Err(e) => {
            warn!("Query '{}' failed: {}: {}", query.ref_id, e.category(), e);
            DataResponse::from_error(&e)
        }
    }
}

async fn run_query(connection: &Connection, ctx: &QueryContext, query: &DataQuery) -> Result<Table> {
    let request = QueryRequest::from_data_query(query)?;
    let raw = connection
        .execute(ctx, &request.query_text, request.params.as_ref())
        .await?;
    normalize(raw)
}
