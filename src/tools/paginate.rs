//! Pagination control tool.
//!
//! This module implements the `paginate` MCP tool for stepping through a
//! paginated query result: next/previous/goto/info/clear, all scoped to a
//! session id.

use crate::audit::{AuditSink, QueryLogEntry};
use crate::error::{DbError, DbResult};
use crate::pagination::{DEFAULT_SESSION_ID, PageResult, PaginationInfo, PaginationStore, Row};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Pagination operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaginateAction {
    /// Advance to the next page
    Next,
    /// Go back to the previous page
    Previous,
    /// Jump to a specific page (requires `page`)
    Goto,
    /// Return pagination metadata without data
    Info,
    /// Drop the session's pagination state
    Clear,
}

impl std::fmt::Display for PaginateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Goto => "goto",
            Self::Info => "info",
            Self::Clear => "clear",
        };
        write!(f, "{}", name)
    }
}

/// Input for the paginate tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PaginateInput {
    /// Pagination operation to perform
    pub action: PaginateAction,
    /// Target page number (goto only, 1-based)
    #[serde(default)]
    pub page: Option<u32>,
    /// Session id. Defaults to "default".
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Output from the paginate tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PaginateOutput {
    /// Rows of the requested page (empty for info/clear and at boundaries)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Row>,
    /// Pagination metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
    /// Acknowledgement or notice, e.g. after clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaginateOutput {
    fn from_page(result: PageResult) -> Self {
        Self {
            data: result.data,
            pagination: result.pagination,
            message: None,
        }
    }

    fn message(text: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            pagination: None,
            message: Some(text.into()),
        }
    }
}

/// Handler for pagination control.
pub struct PaginateToolHandler {
    pagination: Arc<PaginationStore>,
    audit: Arc<dyn AuditSink>,
}

impl PaginateToolHandler {
    /// Create a new pagination tool handler.
    pub fn new(pagination: Arc<PaginationStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { pagination, audit }
    }

    /// Handle the paginate tool call. Failed operations are recorded in the
    /// audit log before the error is returned.
    pub async fn paginate(&self, input: PaginateInput) -> DbResult<PaginateOutput> {
        let session_id = input.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID);

        let result = match input.action {
            PaginateAction::Next => self
                .pagination
                .next_page(session_id)
                .await
                .map(PaginateOutput::from_page),
            PaginateAction::Previous => self
                .pagination
                .previous_page(session_id)
                .await
                .map(PaginateOutput::from_page),
            PaginateAction::Goto => match input.page {
                Some(page) => self
                    .pagination
                    .go_to_page(page, session_id)
                    .await
                    .map(PaginateOutput::from_page),
                None => Err(DbError::missing_argument("page")),
            },
            PaginateAction::Info => Ok(match self.pagination.info(session_id).await {
                Some(info) => PaginateOutput {
                    data: Vec::new(),
                    pagination: Some(info),
                    message: None,
                },
                None => PaginateOutput::message("no pagination state"),
            }),
            PaginateAction::Clear => {
                self.pagination.clear(session_id).await;
                Ok(PaginateOutput::message("pagination state cleared"))
            }
        };

        if let Err(e) = &result {
            let mut params = vec![session_id.to_string()];
            if let Some(page) = input.page {
                params.push(page.to_string());
            }
            let entry =
                QueryLogEntry::failure(format!("paginate: {}", input.action), &params, e.to_string());
            if let Err(log_err) = self.audit.record(entry).await {
                warn!(error = %log_err, "Failed to write audit log entry");
            }
        }

        result
    }
}
