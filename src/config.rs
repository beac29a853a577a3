//! Configuration handling for the MySQL MCP Server.
//!
//! This module provides configuration management via CLI arguments and
//! environment variables. Database coordinates are supplied by the hosting
//! process (flags or `DB_*` environment variables); the rest of the crate
//! consumes the built `Config` and performs no environment parsing of its own.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_LOG_FILE: &str = "logs/query.log";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// HTTP with Server-Sent Events (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the MySQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mysql-mcp-server",
    about = "MCP server for MySQL - safe queries, result pagination and audit logging for AI assistants",
    version,
    author
)]
pub struct Config {
    /// MySQL server hostname
    #[arg(long, default_value = DEFAULT_DB_HOST, env = "DB_HOST")]
    pub db_host: String,

    /// MySQL server port
    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "DB_PORT")]
    pub db_port: u16,

    /// MySQL user name
    #[arg(long, env = "DB_USER")]
    pub db_user: String,

    /// MySQL password (sensitive - never logged)
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: String,

    /// Database name to connect to
    #[arg(long, env = "DB_NAME")]
    pub db_name: String,

    /// Maximum connections in the pool
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "DB_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Path of the append-only query audit log
    #[arg(long, default_value = DEFAULT_LOG_FILE, env = "MCP_QUERY_LOG")]
    pub query_log: PathBuf,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection acquire timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS,
        env = "MCP_ACQUIRE_TIMEOUT"
    )]
    pub acquire_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_user: "user".to_string(),
            db_password: String::new(),
            db_name: "test".to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            query_log: PathBuf::from(DEFAULT_LOG_FILE),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the acquire timeout as a Duration.
    pub fn acquire_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.db_host, DEFAULT_DB_HOST);
        assert_eq!(config.db_port, DEFAULT_DB_PORT);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_timeout_durations() {
        let config = Config {
            query_timeout: 60,
            acquire_timeout: 15,
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(60));
        assert_eq!(config.acquire_timeout_duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_transport_mode_display() {
        assert_eq!(TransportMode::Stdio.to_string(), "stdio");
        assert_eq!(TransportMode::Http.to_string(), "http");
    }
}
