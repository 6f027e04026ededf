//! Connection management for surreal-bridge.
//!
//! Wraps the shared database client with cancellable, deadline-aware
//! execution.

mod context;
mod session;

pub use context::QueryContext;
pub use session::Connection;
