//! surreal-bridge - batch SurrealDB queries shaped into columnar tables.
//!
//! A [`datasource::Datasource`] accepts batches of queries, runs each one
//! concurrently against SurrealDB and returns one keyed response per query:
//! either a table with one column per field, or an error saying who is at
//! fault.

pub mod cli;
pub mod config;
pub mod connection;
pub mod datasource;
pub mod db;
pub mod error;
pub mod health;
pub mod logging;
pub mod query;
pub mod secrets;
