//! Connectivity probe for the configured data source.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connection::{Connection, QueryContext};

/// Statement used to check that the server accepts queries without
/// touching any data.
pub const HEALTH_CHECK_QUERY: &str = "BEGIN TRANSACTION; CANCEL TRANSACTION;";

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

/// Result of a health check as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthCheckResult {
    fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
            message: "Data source is working".to_string(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }

    /// Returns true if the data source is reachable.
    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// Runs the probe statement through the connection.
///
/// Failures are reported in the result, never as an error.
pub async fn check_health(connection: &Connection, timeout: Option<Duration>) -> HealthCheckResult {
    let ctx = match timeout {
        Some(timeout) => QueryContext::background().with_timeout(timeout),
        None => QueryContext::background(),
    };

    match connection.execute(&ctx, HEALTH_CHECK_QUERY, None).await {
        Ok(_) => {
            debug!("Health check passed");
            HealthCheckResult::ok()
        }
        Err(e) => {
            warn!("Health check failed: {}", e);
            HealthCheckResult::error(format!("error while checking database health: {e}"))
        }
    }
}
