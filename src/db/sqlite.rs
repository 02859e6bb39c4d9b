//! SQLite database client implementation.
//!
//! SQLite ignores the login pair; the URL names the database file
//! (`sqlite:/path/to/file.db`). The file must already exist.

use super::{
    decode, with_retry, ColumnInfo, DatabaseBackend, DatabaseClient, Value, ACQUIRE_TIMEOUT,
};
use crate::config::ConnectionConfig;
use crate::db::query_error_message;
use crate::error::{DeskError, Result};
use crate::table::{BufferedCursor, ResultTable};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Sqlite, Statement, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// SQLite database client holding a single-connection session.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens a session, making at most `attempts` connection attempts.
    pub async fn connect(config: &ConnectionConfig, attempts: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DeskError::config(format!("Invalid SQLite URL: {e}")))?;

        let pool = with_retry(config, attempts, || {
            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect_with(options.clone())
        })
        .await?;

        Ok(Self { pool })
    }

    /// Creates a new SqliteClient from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn describe_columns(&self, sql: &str) -> Vec<ColumnInfo> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(e) => {
                debug!("Could not describe empty result: {}", e);
                Vec::new()
            }
        }
    }

    fn materialize(
        columns: Vec<ColumnInfo>,
        rows: Vec<SqliteRow>,
        started: Instant,
    ) -> Result<ResultTable> {
        let mut cursor = BufferedCursor::new(columns, rows, extract_cell);
        Ok(ResultTable::materialize(&mut cursor)?.with_execution_time(started.elapsed()))
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, sql: &str) -> Result<ResultTable> {
        let started = Instant::now();

        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeskError::query(query_error_message(&e)))?;

        let columns = match rows.first() {
            Some(row) => decode::row_columns(row),
            None => self.describe_columns(sql).await,
        };

        Self::materialize(columns, rows, started)
    }

    async fn execute_update(&self, sql: &str) -> Result<u64> {
        let result = sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| DeskError::query(query_error_message(&e)))?;
        Ok(result.rows_affected())
    }

    async fn query_with(&self, sql: &str, params: &[Value]) -> Result<ResultTable> {
        let started = Instant::now();
        let query = params.iter().fold(sqlx::query(sql), bind_value);
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeskError::query(query_error_message(&e)))?;

        let columns = match rows.first() {
            Some(row) => decode::row_columns(row),
            None => self.describe_columns(sql).await,
        };

        Self::materialize(columns, rows, started)
    }

    async fn execute_with(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let query = params.iter().fold(sqlx::query(sql), bind_value);
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| DeskError::query(query_error_message(&e)))?;
        Ok(result.rows_affected())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Decimal(s) | Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Date(d) => query.bind(*d),
        Value::Time(t) => query.bind(*t),
        Value::DateTime(dt) => query.bind(*dt),
    }
}

/// Converts a cell using its storage class, refined by the declared column type.
fn extract_cell(row: &SqliteRow, index: usize, declared: &str) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| DeskError::query(e.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();

    match (declared.to_uppercase().as_str(), storage.as_str()) {
        ("BOOLEAN", "INTEGER") => decode::typed(row, index, Value::Bool),
        ("DATE", "TEXT") => decode::typed::<_, NaiveDate>(row, index, Value::Date),
        ("TIME", "TEXT") => decode::typed::<_, NaiveTime>(row, index, Value::Time),
        ("DATETIME", "TEXT") => decode::typed::<_, NaiveDateTime>(row, index, Value::DateTime),
        (_, "INTEGER") => decode::typed(row, index, Value::Int),
        (_, "REAL") => decode::typed(row, index, Value::Float),
        (_, "BLOB") => decode::typed(row, index, Value::Bytes),
        _ => decode::fallback(row, index),
    }
}
