//! Error types for the MySQL MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error
//! handling. Each error variant carries enough context for an AI assistant to
//! understand what went wrong and correct the call.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Query rejected: {reason}")]
    ValidationRejected { reason: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error(
        "No pagination state for session '{session_id}'. Run a paginated query first with the query tool."
    )]
    NoPaginationState { session_id: String },

    #[error("Page {page} out of range. Valid range: 1-{total_pages}")]
    PageOutOfRange { page: u32, total_pages: u32 },

    #[error("Missing argument: {name}")]
    MissingArgument { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a validation rejection with a human-readable reason.
    pub fn validation_rejected(reason: impl Into<String>) -> Self {
        Self::ValidationRejected {
            reason: reason.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a missing-pagination-state error.
    pub fn no_pagination_state(session_id: impl Into<String>) -> Self {
        Self::NoPaginationState {
            session_id: session_id.into(),
        }
    }

    /// Create a page-out-of-range error.
    pub fn page_out_of_range(page: u32, total_pages: u32) -> Self {
        Self::PageOutOfRange { page, total_pages }
    }

    /// Create a missing-argument error.
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a table-not-found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is corrected by changing the call (as opposed to
    /// an infrastructure failure).
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            Self::ValidationRejected { .. }
                | Self::PageOutOfRange { .. }
                | Self::MissingArgument { .. }
                | Self::InvalidInput { .. }
                | Self::NoPaginationState { .. }
                | Self::TableNotFound { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection settings and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::database(
                format!("Column not found: {}", col),
                None,
                "Check the column names against the table schema",
            ),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            // Caller-correctable input problems -> invalid_params
            DbError::ValidationRejected { .. } => rmcp::ErrorData::invalid_params(
                err.to_string(),
                suggestion_data(Some("Only SELECT and SHOW statements are accepted")),
            ),
            DbError::MissingArgument { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }
            DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }
            DbError::PageOutOfRange { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }

            // Missing state or objects -> resource_not_found
            DbError::NoPaginationState { .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                suggestion_data(Some(
                    "Run a query with pagination enabled before paging through results",
                )),
            ),
            DbError::TableNotFound { .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                suggestion_data(Some("Use the schema tool to list existing tables")),
            ),

            // Database errors -> invalid_params with sql_state in message
            DbError::Database {
                message,
                sql_state,
                suggestion,
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, suggestion_data(Some(suggestion)))
            }

            // Connection, Timeout -> internal_error (retryable by the caller)
            DbError::Connection { suggestion, .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(Some(suggestion)))
            }
            DbError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some(
                    "Consider increasing the timeout or narrowing the query",
                )),
            ),

            // Internal -> internal_error
            DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }
        }
    }
}
