//! MySQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to query a MySQL database safely, with result pagination and audit logging.

use clap::Parser;
use mysql_mcp_server::audit::FileAuditLog;
use mysql_mcp_server::config::{Config, TransportMode};
use mysql_mcp_server::db::QueryExecutor;
use mysql_mcp_server::mcp::MysqlService;
use mysql_mcp_server::pagination::PaginationStore;
use mysql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        transport = %config.transport,
        database = %config.db_name,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Connect to the configured database at startup
    let pool = mysql_mcp_server::db::connect(&config).await?;

    // Shared components: executor, audit log, pagination store
    let executor = Arc::new(QueryExecutor::with_timeout(
        pool,
        config.query_timeout_duration(),
    ));
    let audit = Arc::new(FileAuditLog::new(&config.query_log)?);
    let pagination = Arc::new(PaginationStore::new());

    info!(query_log = %config.query_log.display(), "Audit log ready");

    let service = MysqlService::new(
        executor.clone(),
        audit,
        pagination,
        config.db_name.clone(),
    );

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(service, executor);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                service,
                executor,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
