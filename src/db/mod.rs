//! Database access layer.
//!
//! This module provides:
//! - Connection pool setup
//! - Query execution
//! - MySQL row -> JSON type mappings

pub mod executor;
pub mod pool;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::connect;
pub use types::RowToJson;
