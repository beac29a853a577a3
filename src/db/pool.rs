//! Connection pool setup.
//!
//! Builds the single `MySqlPool` used by the executor from the server
//! configuration. Pool sizing, acquire timeouts and reconnection are the
//! pool's responsibility; the executor performs one attempt per query.

use crate::config::Config;
use crate::error::{DbError, DbResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{debug, info, warn};

/// Connect to the configured MySQL database and build the connection pool.
pub async fn connect(config: &Config) -> DbResult<MySqlPool> {
    info!(
        host = %config.db_host,
        port = config.db_port,
        database = %config.db_name,
        "Connecting to MySQL"
    );

    let options = MySqlConnectOptions::new()
        .host(&config.db_host)
        .port(config.db_port)
        .username(&config.db_user)
        .password(&config.db_password)
        .database(&config.db_name)
        .charset("utf8mb4");

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout_duration())
        .connect_with(options)
        .await
        .map_err(|e| {
            DbError::connection(format!("Failed to connect: {}", e), connection_suggestion(&e))
        })?;

    if let Some(version) = server_version(&pool).await {
        info!(version = %version, "Connected to MySQL");
    }

    Ok(pool)
}

/// Get the server version from the connected database.
async fn server_version(pool: &MySqlPool) -> Option<String> {
    match sqlx::query_scalar::<_, String>("SELECT version()")
        .fetch_one(pool)
        .await
    {
        Ok(version) => {
            debug!(version = %version, "Got server version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get server version");
            None
        }
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return "Check that the MySQL server is running and accessible".to_string();
    }

    if error_str.contains("authentication") || error_str.contains("access denied") {
        return "Verify the DB_USER and DB_PASSWORD settings".to_string();
    }

    if error_str.contains("unknown database") {
        return "Check that the database named by DB_NAME exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    "Verify the DB_HOST/DB_PORT/DB_USER/DB_PASSWORD/DB_NAME settings".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_suggestion_refused() {
        let err = sqlx::Error::Protocol("connection refused by peer".to_string());
        assert!(connection_suggestion(&err).contains("running"));
    }

    #[test]
    fn test_connection_suggestion_auth() {
        let err = sqlx::Error::Protocol("Access denied for user 'u'@'host'".to_string());
        assert!(connection_suggestion(&err).contains("DB_PASSWORD"));
    }

    #[test]
    fn test_connection_suggestion_fallback() {
        let err = sqlx::Error::Protocol("something odd".to_string());
        assert!(connection_suggestion(&err).contains("DB_HOST"));
    }
}
