//! Audit log retrieval tool.
//!
//! This module implements the `logs` MCP tool for reading back the query
//! audit log, newest entries first, with an optional outcome filter.

use crate::audit::{AuditSink, LogFilter, QueryLogEntry};
use crate::error::DbResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default number of entries returned.
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// Input for the logs tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LogsInput {
    /// Maximum number of entries to return. Default: 50
    #[serde(default)]
    pub limit: Option<usize>,
    /// Outcome filter: all, success or error. Default: all
    #[serde(default)]
    pub filter: Option<LogFilter>,
}

/// Output from the logs tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct LogsOutput {
    /// Log entries, newest first
    pub logs: Vec<QueryLogEntry>,
    /// Number of entries returned
    pub total: usize,
    /// Filter that was applied
    pub filter: LogFilter,
}

/// Handler for audit log retrieval.
pub struct LogsToolHandler {
    audit: Arc<dyn AuditSink>,
}

impl LogsToolHandler {
    /// Create a new logs tool handler.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }

    /// Handle the logs tool call.
    pub async fn logs(&self, input: LogsInput) -> DbResult<LogsOutput> {
        let limit = input.limit.unwrap_or(DEFAULT_LOG_LIMIT);
        let filter = input.filter.unwrap_or_default();

        let logs = self.audit.read_back(limit, filter).await?;

        Ok(LogsOutput {
            total: logs.len(),
            logs,
            filter,
        })
    }
}
