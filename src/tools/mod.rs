//! MCP tool implementations.
//!
//! This module contains all tool handlers:
//! - `query`: Execute validated SELECT/SHOW queries with optional pagination
//! - `schema`: Table and column metadata from INFORMATION_SCHEMA
//! - `ddl`: Retrieve a table's CREATE statement
//! - `paginate`: Step through a paginated result (next/previous/goto/info/clear)
//! - `logs`: Read back the query audit log
//! - `guard`: SQL safety validation for read-only enforcement

pub mod guard;
pub mod logs;
pub mod paginate;
pub mod query;
pub mod schema;

pub use logs::{LogsInput, LogsOutput, LogsToolHandler};
pub use paginate::{PaginateAction, PaginateInput, PaginateOutput, PaginateToolHandler};
pub use query::{QueryInput, QueryOutput, QueryToolHandler};
pub use schema::{DdlInput, DdlOutput, SchemaInput, SchemaOutput, SchemaToolHandler};
