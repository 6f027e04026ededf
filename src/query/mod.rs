//! Query execution and result shaping for surreal-bridge.
//!
//! This module turns host query batches into keyed responses: decoding and
//! macro expansion, concurrent dispatch, and row-to-column normalization.

pub mod dispatcher;
pub mod frame;
pub mod macros;
pub mod normalize;
pub mod request;
pub mod response;

pub use dispatcher::Dispatcher;
pub use frame::{Column, Table};
pub use macros::{expand_macros, MacroContext, TimeRange};
pub use normalize::normalize;
pub use request::{DataQuery, QueryDataRequest, QueryRequest};
pub use response::{BatchResponse, DataResponse, QueryError};
