//! Error types for surreal-bridge.
//!
//! Every failure that can happen while answering a query is captured as a
//! `BridgeError` and attached to that query's slot in the batch response.
//! The error also knows who is at fault (`ErrorSource`) and how the host
//! should report it (`ResponseStatus`).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Main error type for surreal-bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The query model sent by the caller could not be decoded or expanded.
    #[error("Invalid query: {0}")]
    BadRequest(String),

    /// The remote database reported a failure (syntax errors, unknown tables, etc.)
    #[error("Query error: {0}")]
    Downstream(String),

    /// A successful remote reply could not be shaped into a table.
    #[error("Response error: {0}")]
    Plugin(String),

    /// The request or batch was cancelled before the remote call returned.
    #[error("Query cancelled")]
    Cancelled,

    /// The per-query deadline expired before the remote call returned.
    #[error("Query timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// Database connection errors (host unreachable, sign-in failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage errors (keyring unavailable, entry missing, etc.)
    #[error("Secret storage error: {0}")]
    Secret(String),
}

/// Who is responsible for a failed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    /// The request itself was malformed.
    Caller,
    /// The remote database failed or did not answer in time.
    Downstream,
    /// The bridge could not handle an otherwise valid exchange.
    Plugin,
}

/// Status reported to the host alongside an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    BadRequest,
    Cancelled,
    Timeout,
    Internal,
}

impl BridgeError {
    /// Creates a bad request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Creates a downstream error with the given message.
    pub fn downstream(msg: impl Into<String>) -> Self {
        Self::Downstream(msg.into())
    }

    /// Creates a plugin-internal error with the given message.
    pub fn plugin(msg: impl Into<String>) -> Self {
        Self::Plugin(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a secret storage error with the given message.
    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Bad Request",
            Self::Downstream(_) => "Downstream Error",
            Self::Plugin(_) => "Plugin Error",
            Self::Cancelled => "Cancelled",
            Self::Timeout(_) => "Timeout",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
            Self::Secret(_) => "Secret Storage Error",
        }
    }

    /// Returns which party the error is attributed to.
    pub fn source_kind(&self) -> ErrorSource {
        match self {
            Self::BadRequest(_) => ErrorSource::Caller,
            Self::Downstream(_) | Self::Cancelled | Self::Timeout(_) => ErrorSource::Downstream,
            Self::Plugin(_) | Self::Connection(_) | Self::Config(_) | Self::Secret(_) => {
                ErrorSource::Plugin
            }
        }
    }

    /// Returns the status the host should report for this error.
    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::BadRequest(_) | Self::Downstream(_) => ResponseStatus::BadRequest,
            Self::Cancelled => ResponseStatus::Cancelled,
            Self::Timeout(_) => ResponseStatus::Timeout,
            Self::Plugin(_) | Self::Connection(_) | Self::Config(_) | Self::Secret(_) => {
                ResponseStatus::Internal
            }
        }
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
