//! Schema introspection tools.
//!
//! This module implements the `schema` and `ddl` MCP tools. Table and column
//! metadata comes from `INFORMATION_SCHEMA`; DDL retrieval uses
//! `SHOW CREATE TABLE`. Both record their executed statements in the audit
//! log like any other query.

use crate::audit::{AuditSink, QueryLogEntry};
use crate::db::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::pagination::Row;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Column metadata query, parameterized by schema and table name.
const TABLE_SCHEMA_SQL: &str = "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_KEY, \
     COLUMN_DEFAULT, EXTRA, COLUMN_COMMENT \
     FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

/// Table listing query, parameterized by schema name.
const ALL_TABLES_SQL: &str = "SELECT TABLE_NAME, TABLE_TYPE, ENGINE, TABLE_ROWS, CREATE_TIME, \
     TABLE_COMMENT \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_SCHEMA = ? \
     ORDER BY TABLE_NAME";

/// Input for the schema tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SchemaInput {
    /// Table name. When omitted, all tables of the database are listed.
    #[serde(default)]
    pub table: Option<String>,
    /// Return full INFORMATION_SCHEMA rows instead of the simplified
    /// projection. Default: true
    #[serde(default = "default_true")]
    pub detailed: bool,
}

fn default_true() -> bool {
    true
}

/// Simplified column description.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnSummary {
    pub name: String,
    /// MySQL column type, e.g. "varchar(64)"
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    /// Key kind: "PRI", "UNI", "MUL" or empty
    pub key: String,
}

/// Simplified table description.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableSummary {
    pub name: String,
    /// "BASE TABLE" or "VIEW"
    #[serde(rename = "type")]
    pub table_type: String,
    /// Estimated row count from INFORMATION_SCHEMA
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
}

/// Output from the schema tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SchemaOutput {
    /// Database the metadata was read from
    pub database: String,
    /// Table name when a single table was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Raw INFORMATION_SCHEMA rows (detailed mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<Row>>,
    /// Simplified column listing (single table, detailed=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnSummary>>,
    /// Simplified table listing (whole database, detailed=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableSummary>>,
    /// Number of columns or tables returned
    pub count: usize,
}

/// Input for the ddl tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DdlInput {
    /// Table name
    pub table: String,
}

/// Output from the ddl tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DdlOutput {
    pub table: String,
    /// CREATE TABLE statement as reported by the server
    pub ddl: String,
}

/// Handler for schema introspection and DDL retrieval.
pub struct SchemaToolHandler {
    executor: Arc<QueryExecutor>,
    audit: Arc<dyn AuditSink>,
    /// Database the pool is connected to
    database: String,
}

impl SchemaToolHandler {
    /// Create a new schema tool handler.
    pub fn new(
        executor: Arc<QueryExecutor>,
        audit: Arc<dyn AuditSink>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            audit,
            database: database.into(),
        }
    }

    /// Handle the schema tool call.
    pub async fn schema(&self, input: SchemaInput) -> DbResult<SchemaOutput> {
        match input.table {
            Some(table) => self.table_schema(table.trim(), input.detailed).await,
            None => self.all_tables(input.detailed).await,
        }
    }

    async fn table_schema(&self, table: &str, detailed: bool) -> DbResult<SchemaOutput> {
        if table.is_empty() {
            return Err(DbError::missing_argument("table"));
        }

        let params = vec![self.database.clone(), table.to_string()];
        let rows = self.run_audited(TABLE_SCHEMA_SQL, &params).await?;
        let count = rows.len();

        info!(table = %table, columns = count, "Fetched table schema");

        if detailed {
            Ok(SchemaOutput {
                database: self.database.clone(),
                table: Some(table.to_string()),
                schema: Some(rows),
                columns: None,
                tables: None,
                count,
            })
        } else {
            let columns = rows
                .iter()
                .map(|row| ColumnSummary {
                    name: get_str(row, "COLUMN_NAME").unwrap_or_default(),
                    column_type: get_str(row, "COLUMN_TYPE").unwrap_or_default(),
                    nullable: get_str(row, "IS_NULLABLE").as_deref() == Some("YES"),
                    key: get_str(row, "COLUMN_KEY").unwrap_or_default(),
                })
                .collect();
            Ok(SchemaOutput {
                database: self.database.clone(),
                table: Some(table.to_string()),
                schema: None,
                columns: Some(columns),
                tables: None,
                count,
            })
        }
    }

    async fn all_tables(&self, detailed: bool) -> DbResult<SchemaOutput> {
        let params = vec![self.database.clone()];
        let rows = self.run_audited(ALL_TABLES_SQL, &params).await?;
        let count = rows.len();

        info!(tables = count, "Fetched table listing");

        if detailed {
            Ok(SchemaOutput {
                database: self.database.clone(),
                table: None,
                schema: Some(rows),
                columns: None,
                tables: None,
                count,
            })
        } else {
            let tables = rows
                .iter()
                .map(|row| TableSummary {
                    name: get_str(row, "TABLE_NAME").unwrap_or_default(),
                    table_type: get_str(row, "TABLE_TYPE").unwrap_or_default(),
                    rows: get_u64(row, "TABLE_ROWS"),
                })
                .collect();
            Ok(SchemaOutput {
                database: self.database.clone(),
                table: None,
                schema: None,
                columns: None,
                tables: Some(tables),
                count,
            })
        }
    }

    /// Handle the ddl tool call.
    pub async fn ddl(&self, input: DdlInput) -> DbResult<DdlOutput> {
        let table = input.table.trim();
        if table.is_empty() {
            return Err(DbError::missing_argument("table"));
        }
        // SHOW CREATE TABLE cannot be parameterized; restrict the identifier
        // instead of interpolating arbitrary text.
        if !is_valid_identifier(table) {
            return Err(DbError::invalid_input(
                "table name may only contain letters, digits, '_' and '$'",
            ));
        }

        let sql = format!("SHOW CREATE TABLE `{}`", table);
        let rows = match self.run_audited(&sql, &[]).await {
            Ok(rows) => rows,
            // MySQL reports a missing table as SQLSTATE 42S02
            Err(DbError::Database {
                sql_state: Some(state),
                ..
            }) if state == "42S02" => {
                return Err(DbError::table_not_found(table));
            }
            Err(e) => return Err(e),
        };

        let first = rows
            .first()
            .ok_or_else(|| DbError::table_not_found(table))?;
        let ddl = get_str(first, "Create Table")
            .or_else(|| get_str(first, "Create View"))
            .ok_or_else(|| {
                DbError::internal("Unexpected SHOW CREATE TABLE result shape")
            })?;

        info!(table = %table, "Fetched DDL");

        Ok(DdlOutput {
            table: table.to_string(),
            ddl,
        })
    }

    /// Execute a statement and record the outcome in the audit log.
    async fn run_audited(&self, sql: &str, params: &[String]) -> DbResult<Vec<Row>> {
        match self.executor.fetch_all(sql, params).await {
            Ok(rows) => {
                self.record(QueryLogEntry::success(sql, params, rows.len()))
                    .await;
                Ok(rows)
            }
            Err(e) => {
                self.record(QueryLogEntry::failure(sql, params, e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn record(&self, entry: QueryLogEntry) {
        if let Err(e) = self.audit.record(entry).await {
            warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

fn get_str(row: &Row, key: &str) -> Option<String> {
    row.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn get_u64(row: &Row, key: &str) -> Option<u64> {
    row.get(key).and_then(|v| v.as_u64())
}

/// Check that a table name is a plain MySQL identifier.
fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
