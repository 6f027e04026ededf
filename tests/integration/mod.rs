//! Integration tests for surreal-bridge.

pub mod batch_test;
pub mod cancellation_test;
pub mod live_test;
