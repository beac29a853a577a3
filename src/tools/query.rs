//! Query execution tool.
//!
//! This module implements the `query` MCP tool: validate the statement,
//! execute it, record the attempt in the audit log, and hand the rows to the
//! pagination store when the result is large.

use crate::audit::{AuditSink, QueryLogEntry};
use crate::db::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::pagination::{
    DEFAULT_PAGE_SIZE, DEFAULT_SESSION_ID, PageResult, PaginationInfo, PaginationStore, Row,
};
use crate::tools::guard;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL SELECT or SHOW statement to execute. Anything else is rejected.
    pub sql: String,
    /// Positional string parameters for ? placeholders
    #[serde(default)]
    pub params: Vec<String>,
    /// Session id scoping pagination state. Defaults to "default". Use a
    /// distinct value per conversation to keep page cursors separate.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Force pagination on or off. When omitted, pagination engages
    /// automatically once the result exceeds twice the page size.
    #[serde(default)]
    pub enable_pagination: Option<bool>,
    /// Rows per page (max 100). Default: 10
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// Output from the query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Result rows (the first page when paginated)
    pub data: Vec<Row>,
    /// Number of rows in `data`
    pub row_count: usize,
    /// Pagination metadata, absent for unpaginated results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

impl From<PageResult> for QueryOutput {
    fn from(result: PageResult) -> Self {
        Self {
            row_count: result.data.len(),
            data: result.data,
            pagination: result.pagination,
        }
    }
}

/// Handler for query execution.
pub struct QueryToolHandler {
    executor: Arc<QueryExecutor>,
    audit: Arc<dyn AuditSink>,
    pagination: Arc<PaginationStore>,
}

impl QueryToolHandler {
    /// Create a new query tool handler.
    pub fn new(
        executor: Arc<QueryExecutor>,
        audit: Arc<dyn AuditSink>,
        pagination: Arc<PaginationStore>,
    ) -> Self {
        Self {
            executor,
            audit,
            pagination,
        }
    }

    /// Handle the query tool call.
    ///
    /// The statement passes through the safety guard before execution; both
    /// rejections and execution outcomes are written to the audit log before
    /// being returned, so the log is a complete record of attempted access.
    pub async fn query(&self, input: QueryInput) -> DbResult<QueryOutput> {
        if input.sql.trim().is_empty() {
            return Err(DbError::missing_argument("sql"));
        }

        if let Err(rejection) = guard::validate_sql(&input.sql) {
            let reason = rejection.reason();
            self.record(QueryLogEntry::failure(&input.sql, &input.params, &reason))
                .await;
            return Err(DbError::validation_rejected(reason));
        }

        let rows = match self.executor.fetch_all(&input.sql, &input.params).await {
            Ok(rows) => rows,
            Err(e) => {
                self.record(QueryLogEntry::failure(
                    &input.sql,
                    &input.params,
                    e.to_string(),
                ))
                .await;
                return Err(e);
            }
        };

        self.record(QueryLogEntry::success(
            &input.sql,
            &input.params,
            rows.len(),
        ))
        .await;

        let session_id = input.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID);
        let page_size = input.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        let enable_pagination = should_paginate(rows.len(), page_size, input.enable_pagination);

        info!(
            session_id = %session_id,
            row_count = rows.len(),
            paginated = enable_pagination,
            "Query executed"
        );

        let result = if enable_pagination {
            self.pagination.paginate(rows, page_size, session_id).await
        } else {
            PageResult::unpaginated(rows)
        };

        Ok(result.into())
    }

    /// Append an audit entry; a failing audit write never fails the query.
    async fn record(&self, entry: QueryLogEntry) {
        if let Err(e) = self.audit.record(entry).await {
            warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

/// Decide whether to paginate a result. An explicit caller choice wins;
/// otherwise pagination engages once the result exceeds twice the page size.
fn should_paginate(row_count: usize, page_size: u32, explicit: Option<bool>) -> bool {
    explicit.unwrap_or(row_count > page_size as usize * 2)
}
