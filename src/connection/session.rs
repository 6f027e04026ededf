//! A live session against the database with cancellable execution.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, warn};

use super::QueryContext;
use crate::db::{DatabaseClient, QueryParams, RawResult};
use crate::error::{BridgeError, Result};

/// Owns the shared database client for one configured data source.
///
/// Every call to [`Connection::execute`] first waits for one of a fixed
/// number of slots, then runs the client call on its own task and races it
/// against the caller's context. The per-query timeout starts once the slot
/// is held, so time spent queued behind other queries does not count. A call
/// that loses the race, or whose `execute` future is dropped, is aborted
/// instead of being left running in the background.
pub struct Connection {
    client: Arc<dyn DatabaseClient>,
    permits: Arc<Semaphore>,
    query_timeout: Option<Duration>,
}

impl Connection {
    /// Creates a connection over a client, allowing at most `max_concurrent`
    /// simultaneous calls (0 means unbounded).
    pub fn new(client: Arc<dyn DatabaseClient>, max_concurrent: usize) -> Self {
        let permits = match max_concurrent {
            0 => Semaphore::MAX_PERMITS,
            n => n.min(Semaphore::MAX_PERMITS),
        };
        Self {
            client,
            permits: Arc::new(Semaphore::new(permits)),
            query_timeout: None,
        }
    }

    /// Sets the time each call may run once it holds a slot.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Get the underlying database client.
    pub fn client(&self) -> &Arc<dyn DatabaseClient> {
        &self.client
    }

    /// Executes a query under the given context.
    ///
    /// Returns `Cancelled` or `Timeout` when the context wins the race, the
    /// client's own error (downstream) when the call fails, and a plugin
    /// error if the call task panicked.
    pub async fn execute(
        &self,
        ctx: &QueryContext,
        sql: &str,
        params: Option<&QueryParams>,
    ) -> Result<RawResult> {
        if sql.trim().is_empty() {
            return Err(BridgeError::bad_request("query text is empty"));
        }
        if ctx.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        let permit = tokio::select! {
            biased;

            _ = ctx.token().cancelled() => return Err(BridgeError::Cancelled),
            timeout = ctx.expired() => return Err(BridgeError::Timeout(timeout)),
            permit = Arc::clone(&self.permits).acquire_owned() => permit
                .map_err(|_| BridgeError::downstream("connection is closed"))?,
        };

        let ctx = match self.query_timeout {
            Some(timeout) => ctx.clone().with_timeout(timeout),
            None => ctx.clone(),
        };

        let client = Arc::clone(&self.client);
        let sql = sql.to_string();
        let params = params.cloned();

        let mut call = AbortOnDropHandle::new(tokio::spawn(async move {
            let _permit = permit;
            client.execute_query(&sql, params.as_ref()).await
        }));

        tokio::select! {
            biased;

            _ = ctx.token().cancelled() => {
                call.abort();
                debug!("Query cancelled, remote call aborted");
                Err(BridgeError::Cancelled)
            }
            timeout = ctx.expired() => {
                call.abort();
                warn!("Query exceeded its {:?} deadline, remote call aborted", timeout);
                Err(BridgeError::Timeout(timeout))
            }
            joined = &mut call => match joined {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(BridgeError::plugin("query task panicked")),
                Err(_) => Err(BridgeError::Cancelled),
            },
        }
    }

    /// Closes the connection. Calls still waiting for a slot fail immediately.
    pub async fn close(&self) -> Result<()> {
        self.permits.close();
        self.client.close().await
    }
}
