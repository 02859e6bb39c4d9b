//! Per-user usage counters.
//!
//! Each successful operation by a logged user bumps either `num_queries` or
//! `num_updates` in the counter table, on a logging session opened just for
//! that purpose. Failures here never reach the user.

use crate::config::{ConnectionConfig, UsageConfig};
use crate::db::{Connector, DatabaseClient, Value};
use crate::error::{DeskError, Result};
use crate::logging::USAGE_TARGET;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which counter an operation feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A read-only statement that produced a table.
    Query,
    /// A modifying statement that produced a row count.
    Update,
}

impl OperationKind {
    /// Counter column fed by this kind.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Query => "num_queries",
            Self::Update => "num_updates",
        }
    }

    /// Initial `(num_queries, num_updates)` for a user's first operation.
    fn initial_counts(&self) -> (i64, i64) {
        match self {
            Self::Query => (1, 0),
            Self::Update => (0, 1),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// One row of the counter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageCounter {
    pub login_username: String,
    pub num_queries: i64,
    pub num_updates: i64,
}

/// Records operations into the counter table through short-lived logging sessions.
pub struct UsageTracker {
    logging: ConnectionConfig,
    table: String,
    create_table: bool,
    connector: Arc<dyn Connector>,
}

impl UsageTracker {
    /// Creates a tracker writing through sessions opened from `logging`.
    pub fn new(logging: ConnectionConfig, usage: &UsageConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            logging,
            table: usage.table.clone(),
            create_table: usage.create_table,
            connector,
        }
    }

    /// Counter table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Counts one operation for `username`.
    ///
    /// Opens a logging session, upserts the counter row, then closes the session.
    pub async fn record(&self, username: &str, kind: OperationKind) -> Result<()> {
        let db = self
            .connector
            .open(&self.logging)
            .await
            .map_err(|e| DeskError::usage(format!("Cannot open logging session: {e}")))?;

        let outcome = async {
            if self.create_table {
                ensure_table(db.as_ref(), &self.table).await?;
            }
            upsert(db.as_ref(), &self.table, username, kind).await
        }
        .await;

        if let Err(e) = db.close().await {
            debug!("Failed to close logging session: {}", e);
        }

        outcome
    }

    /// Counts one operation, logging and discarding any failure.
    pub async fn record_quietly(&self, username: &str, kind: OperationKind) {
        match self.record(username, kind).await {
            Ok(()) => debug!(target: USAGE_TARGET, "Counted {} for {}", kind, username),
            Err(e) => warn!(target: USAGE_TARGET, "Usage logging failed for {}: {}", username, e),
        }
    }

    /// Reads the counters for `username` on a fresh logging session.
    pub async fn fetch(&self, username: &str) -> Result<Option<UsageCounter>> {
        let db = self
            .connector
            .open(&self.logging)
            .await
            .map_err(|e| DeskError::usage(format!("Cannot open logging session: {e}")))?;
        let counter = fetch_counter(db.as_ref(), &self.table, username).await;
        if let Err(e) = db.close().await {
            debug!("Failed to close logging session: {}", e);
        }
        counter
    }
}

/// Creates the counter table if it does not exist.
pub async fn ensure_table(db: &dyn DatabaseClient, table: &str) -> Result<()> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
         login_username VARCHAR(255) NOT NULL PRIMARY KEY, \
         num_queries INTEGER NOT NULL DEFAULT 0, \
         num_updates INTEGER NOT NULL DEFAULT 0)"
    );
    db.execute_update(&sql)
        .await
        .map_err(|e| DeskError::usage(e.to_string()))?;
    Ok(())
}

/// Reads the counter row for `username`, if one exists.
pub async fn fetch_counter(
    db: &dyn DatabaseClient,
    table: &str,
    username: &str,
) -> Result<Option<UsageCounter>> {
    let p1 = db.backend().placeholder(1);
    let sql = format!(
        "SELECT login_username, num_queries, num_updates FROM {table} WHERE login_username = {p1}"
    );
    let result = db
        .query_with(&sql, &[Value::from(username)])
        .await
        .map_err(|e| DeskError::usage(e.to_string()))?;

    if result.is_empty() {
        return Ok(None);
    }

    let count = |name: &str| -> Result<i64> {
        result
            .find_column(name)
            .and_then(|col| result.value_at(0, col))
            .and_then(Value::as_int)
            .ok_or_else(|| DeskError::usage(format!("Counter row lacks a numeric '{name}'")))
    };

    Ok(Some(UsageCounter {
        login_username: username.to_string(),
        num_queries: count("num_queries")?,
        num_updates: count("num_updates")?,
    }))
}

/// Inserts a fresh counter row or increments the matching column.
///
/// Select then write, with no transaction: two concurrent first operations
/// by the same user can both insert, and concurrent increments can be lost.
pub async fn upsert(
    db: &dyn DatabaseClient,
    table: &str,
    username: &str,
    kind: OperationKind,
) -> Result<()> {
    let backend = db.backend();
    let existing = fetch_counter(db, table, username).await?;

    let affected = match existing {
        None => {
            let (queries, updates) = kind.initial_counts();
            let sql = format!(
                "INSERT INTO {table} (login_username, num_queries, num_updates) VALUES ({}, {}, {})",
                backend.placeholder(1),
                backend.placeholder(2),
                backend.placeholder(3)
            );
            db.execute_with(
                &sql,
                &[Value::from(username), Value::Int(queries), Value::Int(updates)],
            )
            .await
        }
        Some(_) => {
            let column = kind.column();
            let sql = format!(
                "UPDATE {table} SET {column} = {column} + 1 WHERE login_username = {}",
                backend.placeholder(1)
            );
            db.execute_with(&sql, &[Value::from(username)]).await
        }
    }
    .map_err(|e| DeskError::usage(e.to_string()))?;

    debug!("Usage upsert for {} touched {} row(s)", username, affected);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Properties;
    use crate::db::{DriverConnector, FailingDatabaseClient, MockDatabaseClient, SqliteClient};
    use crate::table::ResultTable;
    use crate::db::ColumnInfo;
    use async_trait::async_trait;

    async fn scratch_db(dir: &tempfile::TempDir) -> (ConnectionConfig, SqliteClient) {
        let path = dir.path().join("operationslog.db");
        std::fs::File::create(&path).unwrap();
        let props = Properties::parse(&format!(
            "driver=sqlite\nurl=sqlite:{}\nuser=project3app\npassword=pw\n",
            path.display()
        ))
        .unwrap();
        let config = ConnectionConfig::from_properties(&props).unwrap();
        let client = SqliteClient::connect(&config, 1).await.unwrap();
        (config, client)
    }

    #[test]
    fn test_operation_columns() {
        assert_eq!(OperationKind::Query.column(), "num_queries");
        assert_eq!(OperationKind::Update.column(), "num_updates");
        assert_eq!(OperationKind::Update.initial_counts(), (0, 1));
    }

    #[tokio::test]
    async fn test_first_operation_inserts_then_increments() {
        let dir = tempfile::tempdir().unwrap();
        let (_, db) = scratch_db(&dir).await;
        ensure_table(&db, "operationscount").await.unwrap();

        upsert(&db, "operationscount", "client1", OperationKind::Query)
            .await
            .unwrap();
        assert_eq!(
            fetch_counter(&db, "operationscount", "client1").await.unwrap(),
            Some(UsageCounter {
                login_username: "client1".to_string(),
                num_queries: 1,
                num_updates: 0,
            })
        );

        upsert(&db, "operationscount", "client1", OperationKind::Query)
            .await
            .unwrap();
        let counter = fetch_counter(&db, "operationscount", "client1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.num_queries, 2);
        assert_eq!(counter.num_updates, 0);

        let rows = db
            .execute_query("SELECT COUNT(*) FROM operationscount")
            .await
            .unwrap();
        assert_eq!(rows.value_at(0, 0), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn test_update_counter_is_independent() {
        let dir = tempfile::tempdir().unwrap();
        let (_, db) = scratch_db(&dir).await;
        ensure_table(&db, "operationscount").await.unwrap();

        upsert(&db, "operationscount", "client2", OperationKind::Update)
            .await
            .unwrap();
        upsert(&db, "operationscount", "client2", OperationKind::Query)
            .await
            .unwrap();

        let counter = fetch_counter(&db, "operationscount", "client2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!((counter.num_queries, counter.num_updates), (1, 1));
        assert_eq!(
            fetch_counter(&db, "operationscount", "root").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_tracker_creates_table_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _) = scratch_db(&dir).await;
        let usage = UsageConfig {
            create_table: true,
            ..UsageConfig::default()
        };
        let tracker = UsageTracker::new(config, &usage, Arc::new(DriverConnector::single_attempt()));

        tracker.record("client1", OperationKind::Update).await.unwrap();
        tracker.record("client1", OperationKind::Update).await.unwrap();

        let counter = tracker.fetch("client1").await.unwrap().unwrap();
        assert_eq!((counter.num_queries, counter.num_updates), (0, 2));
    }

    #[tokio::test]
    async fn test_missing_table_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _) = scratch_db(&dir).await;
        let tracker = UsageTracker::new(
            config,
            &UsageConfig::default(),
            Arc::new(DriverConnector::single_attempt()),
        );

        let err = tracker.record("client1", OperationKind::Query).await.unwrap_err();
        assert!(matches!(err, DeskError::Usage(_)));

        // The quiet variant swallows the same failure.
        tracker.record_quietly("client1", OperationKind::Query).await;
    }

    struct StaticConnector(std::sync::Mutex<Option<Box<dyn DatabaseClient>>>);

    #[async_trait]
    impl Connector for StaticConnector {
        async fn open(&self, _config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| DeskError::connection("no more sessions"))
        }
    }

    #[tokio::test]
    async fn test_backend_placeholders_and_session_closed() {
        let select = "SELECT login_username, num_queries, num_updates FROM operationscount WHERE login_username = ?";
        let empty = ResultTable::from_parts(
            vec![
                ColumnInfo::new("login_username", "TEXT"),
                ColumnInfo::new("num_queries", "INTEGER"),
                ColumnInfo::new("num_updates", "INTEGER"),
            ],
            vec![],
        )
        .unwrap();
        let mock = MockDatabaseClient::new().with_result(select, empty);
        let log = mock.statement_log();
        let closed = mock.closed_flag();

        let dir = tempfile::tempdir().unwrap();
        let (config, _) = scratch_db(&dir).await;
        let tracker = UsageTracker::new(
            config,
            &UsageConfig::default(),
            Arc::new(StaticConnector(std::sync::Mutex::new(Some(Box::new(mock))))),
        );

        tracker.record("client1", OperationKind::Query).await.unwrap();

        let statements = log.lock().unwrap().clone();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], select);
        assert!(statements[1].starts_with("INSERT INTO operationscount"));
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failing_logging_session_query() {
        let err = upsert(
            &FailingDatabaseClient::new("Table 'project3.operationscount' doesn't exist"),
            "operationscount",
            "client1",
            OperationKind::Query,
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Usage logging error: Table 'project3.operationscount' doesn't exist"
        );
    }
}
