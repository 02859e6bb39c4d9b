//! Database abstraction layer for sqldesk.
//!
//! Provides a trait-based interface for database operations, allowing
//! different database backends to be used interchangeably.

mod decode;
mod mock;
mod mysql;
mod postgres;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use mysql::MySqlClient;
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::{DeskError, Result};
use crate::table::ResultTable;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection attempts for an interactive session.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// How long to wait for the session's single connection.
pub(crate) const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    MySql,
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Resolves a driver identifier, either a JDBC driver class or a short name.
    pub fn from_driver(driver: &str) -> Option<Self> {
        match driver.trim().to_lowercase().as_str() {
            "com.mysql.cj.jdbc.driver" | "com.mysql.jdbc.driver" | "org.mariadb.jdbc.driver"
            | "mysql" | "mariadb" => Some(Self::MySql),
            "org.postgresql.driver" | "postgres" | "postgresql" => Some(Self::Postgres),
            "org.sqlite.jdbc" | "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql => 3306,
            Self::Postgres => 5432,
            Self::Sqlite => 0,
        }
    }

    /// Returns the bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${index}"),
            Self::MySql | Self::Sqlite => "?".to_string(),
        }
    }
}

/// Opens a session for the given configuration, retrying transient failures.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    connect_with_attempts(config, MAX_RETRY_ATTEMPTS).await
}

/// Opens a session, making at most `attempts` connection attempts.
pub async fn connect_with_attempts(
    config: &ConnectionConfig,
    attempts: u32,
) -> Result<Box<dyn DatabaseClient>> {
    debug!("Opening {} session to {}", config.backend.as_str(), config.display_string());
    match config.backend {
        DatabaseBackend::MySql => Ok(Box::new(MySqlClient::connect(config, attempts).await?)),
        DatabaseBackend::Postgres => {
            Ok(Box::new(PostgresClient::connect(config, attempts).await?))
        }
        DatabaseBackend::Sqlite => Ok(Box::new(SqliteClient::connect(config, attempts).await?)),
    }
}

/// Opens sessions. The seam lets callers substitute in-memory clients.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new session for `config`.
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}

/// Connector backed by the real drivers.
#[derive(Debug, Clone, Copy)]
pub struct DriverConnector {
    attempts: u32,
}

impl DriverConnector {
    /// A connector that makes a single attempt and never retries.
    pub fn single_attempt() -> Self {
        Self { attempts: 1 }
    }
}

impl Default for DriverConnector {
    fn default() -> Self {
        Self {
            attempts: MAX_RETRY_ATTEMPTS,
        }
    }
}

#[async_trait]
impl Connector for DriverConnector {
    async fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        connect_with_attempts(config, self.attempts).await
    }
}

/// Trait defining the interface for database clients.
///
/// All operations are async and return Results with DeskError. A client owns
/// exactly one connection; it is the session.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// The backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Executes a read statement and materializes every row.
    async fn execute_query(&self, sql: &str) -> Result<ResultTable>;

    /// Executes a modifying statement and returns the affected row count.
    async fn execute_update(&self, sql: &str) -> Result<u64>;

    /// Executes a parameterized read statement.
    async fn query_with(&self, sql: &str, params: &[Value]) -> Result<ResultTable>;

    /// Executes a parameterized modifying statement.
    async fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Closes the session.
    async fn close(&self) -> Result<()>;
}

/// Runs `attempt` until it succeeds, a non-transient error occurs, or
/// `max_attempts` is reached, doubling the delay between tries.
pub(crate) async fn with_retry<T, F, Fut>(
    config: &ConnectionConfig,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
    let mut number = 1;

    loop {
        debug!("Connection attempt {} of {}", number, max_attempts);

        let error = match attempt().await {
            Ok(value) => {
                debug!("Successfully connected to database");
                return Ok(value);
            }
            Err(e) => e,
        };

        if number >= max_attempts || !is_transient_error(&error) {
            return Err(map_connection_error(error, config));
        }

        warn!(
            "Connection attempt {} failed (transient error), retrying in {:?}",
            number, delay
        );
        tokio::time::sleep(delay).await;
        delay *= 2;
        number += 1;
    }
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("access denied")
        || error_str.contains("authentication failed")
        || error_str.contains("unknown database")
        || error_str.contains("does not exist")
    {
        return false;
    }

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> DeskError {
    let target = config.display_string();
    let user = &config.user;
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        DeskError::connection(format!(
            "Cannot connect to {target}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") || error_str.contains("authentication failed")
    {
        DeskError::connection(format!(
            "Authentication failed for user '{user}': {error}"
        ))
    } else if error_str.contains("unknown database")
        || (error_str.contains("does not exist") && error_str.contains("database"))
    {
        DeskError::connection(format!("Database for {target} does not exist: {error}"))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        DeskError::connection(format!(
            "Connection to {target} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        DeskError::connection(error.to_string())
    }
}

/// Extracts the driver's own message from an execution error.
pub(crate) fn query_error_message(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_driver() {
        assert_eq!(
            DatabaseBackend::from_driver("com.mysql.cj.jdbc.Driver"),
            Some(DatabaseBackend::MySql)
        );
        assert_eq!(
            DatabaseBackend::from_driver("com.mysql.jdbc.Driver"),
            Some(DatabaseBackend::MySql)
        );
        assert_eq!(
            DatabaseBackend::from_driver("org.postgresql.Driver"),
            Some(DatabaseBackend::Postgres)
        );
        assert_eq!(
            DatabaseBackend::from_driver(" org.sqlite.JDBC "),
            Some(DatabaseBackend::Sqlite)
        );
        assert_eq!(DatabaseBackend::from_driver("SQLITE"), Some(DatabaseBackend::Sqlite));
        assert_eq!(DatabaseBackend::from_driver("oracle.jdbc.OracleDriver"), None);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(DatabaseBackend::Postgres.placeholder(2), "$2");
        assert_eq!(DatabaseBackend::MySql.placeholder(2), "?");
        assert_eq!(DatabaseBackend::Sqlite.placeholder(1), "?");
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(DatabaseBackend::MySql.default_port(), 3306);
        assert_eq!(DatabaseBackend::Postgres.default_port(), 5432);
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient_error(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient_error(&sqlx::Error::RowNotFound));
        assert!(!is_transient_error(&sqlx::Error::Protocol(
            "Access denied for user 'x'".to_string()
        )));
        assert!(is_transient_error(&sqlx::Error::Protocol(
            "connection reset by peer".to_string()
        )));
    }

    #[test]
    fn test_query_error_message_fallback() {
        let message = query_error_message(&sqlx::Error::RowNotFound);
        assert!(message.contains("no rows returned"));
    }
}
