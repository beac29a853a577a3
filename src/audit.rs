//! Query audit logging.
//!
//! Every query attempt - successful, failed, or rejected by validation - is
//! recorded as one JSON object per line in an append-only log file. Entries
//! are immutable once written; the file is the complete record of attempted
//! database access and is never truncated by this process.
//!
//! Storage sits behind the [`AuditSink`] trait so the medium can change
//! (file, embedded store, external log service) without touching the
//! validator, executor, or pagination engine.

use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// One recorded query attempt.
///
/// Serialized with camelCase keys, one object per log line:
/// `{"timestamp":"...","sql":"...","params":[...],"success":true,"resultCount":3,"error":null}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogEntry {
    /// ISO-8601 timestamp of when the attempt concluded
    pub timestamp: String,
    /// The SQL text as submitted
    pub sql: String,
    /// Positional parameters, in order
    pub params: Vec<String>,
    /// Whether the attempt succeeded
    pub success: bool,
    /// Number of rows returned (0 on failure)
    pub result_count: usize,
    /// Error message for failed attempts
    pub error: Option<String>,
}

impl QueryLogEntry {
    /// Entry for a successful query.
    pub fn success(sql: impl Into<String>, params: &[String], result_count: usize) -> Self {
        Self {
            timestamp: now_iso8601(),
            sql: sql.into(),
            params: params.to_vec(),
            success: true,
            result_count,
            error: None,
        }
    }

    /// Entry for a failed or rejected query.
    pub fn failure(sql: impl Into<String>, params: &[String], error: impl Into<String>) -> Self {
        Self {
            timestamp: now_iso8601(),
            sql: sql.into(),
            params: params.to_vec(),
            success: false,
            result_count: 0,
            error: Some(error.into()),
        }
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Outcome filter for log read-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogFilter {
    /// All entries
    #[default]
    All,
    /// Successful queries only
    Success,
    /// Failed or rejected queries only
    Error,
}

impl LogFilter {
    fn matches(&self, entry: &QueryLogEntry) -> bool {
        match self {
            Self::All => true,
            Self::Success => entry.success,
            Self::Error => !entry.success,
        }
    }
}

impl std::fmt::Display for LogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Pluggable audit storage.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry. Appends from concurrent callers must not interleave.
    async fn record(&self, entry: QueryLogEntry) -> DbResult<()>;

    /// Return the most recent `limit` entries, newest first, filtered by
    /// outcome. Malformed entries are skipped, not fatal.
    async fn read_back(&self, limit: usize, filter: LogFilter) -> DbResult<Vec<QueryLogEntry>>;
}

/// File-backed audit log: newline-delimited JSON, append-only.
pub struct FileAuditLog {
    path: PathBuf,
    /// Serializes appends so concurrent writers never split a line.
    append_lock: Mutex<()>,
}

impl FileAuditLog {
    /// Create a file audit log at `path`, creating parent directories as
    /// needed. The file itself is created lazily on first append.
    pub fn new(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DbError::internal(format!(
                        "Failed to create log directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(Self {
            path,
            append_lock: Mutex::new(()),
        })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn record(&self, entry: QueryLogEntry) -> DbResult<()> {
        let line = serde_json::to_string(&entry)
            .map_err(|e| DbError::internal(format!("Failed to serialize log entry: {}", e)))?;

        let _guard = self.append_lock.lock().await;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                DbError::internal(format!(
                    "Failed to open audit log {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        writeln!(file, "{}", line)
            .map_err(|e| DbError::internal(format!("Failed to append audit log entry: {}", e)))?;

        debug!(success = entry.success, "Recorded query log entry");
        Ok(())
    }

    async fn read_back(&self, limit: usize, filter: LogFilter) -> DbResult<Vec<QueryLogEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DbError::internal(format!(
                    "Failed to read audit log {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        // Malformed lines (partial writes, manual edits) are skipped.
        let entries: Vec<QueryLogEntry> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..]
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }
}
