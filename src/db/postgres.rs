//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use super::{
    decode, with_retry, ColumnInfo, DatabaseBackend, DatabaseClient, Value, ACQUIRE_TIMEOUT,
};
use crate::config::ConnectionConfig;
use crate::error::{DeskError, Result};
use crate::table::{BufferedCursor, ResultTable};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Executor, Postgres, Statement, TypeInfo};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// PostgreSQL database client holding a single-connection session.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Opens a session, making at most `attempts` connection attempts.
    pub async fn connect(config: &ConnectionConfig, attempts: u32) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| DeskError::config(format!("Invalid PostgreSQL URL: {e}")))?
            .username(&config.user)
            .password(&config.password);

        let pool = with_retry(config, attempts, || {
            PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect_with(options.clone())
        })
        .await?;

        Ok(Self { pool })
    }

    /// Creates a new PostgresClient from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches column metadata for a query that returned no rows.
    /// Uses a prepared statement to get column info.
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
        rows: Vec<PgRow>,
        started: Instant,
    ) -> Result<ResultTable> {
        let mut cursor = BufferedCursor::new(columns, rows, extract_cell);
        Ok(ResultTable::materialize(&mut cursor)?.with_execution_time(started.elapsed()))
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn execute_query(&self, sql: &str) -> Result<ResultTable> {
        let started = Instant::now();

        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeskError::query(format_query_error(e)))?;

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
            .map_err(|e| DeskError::query(format_query_error(e)))?;
        Ok(result.rows_affected())
    }

    async fn query_with(&self, sql: &str, params: &[Value]) -> Result<ResultTable> {
        let started = Instant::now();
        let query = params.iter().fold(sqlx::query(sql), bind_value);
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DeskError::query(format_query_error(e)))?;

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
            .map_err(|e| DeskError::query(format_query_error(e)))?;
        Ok(result.rows_affected())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
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

/// Converts a single column value from a PgRow to our Value type.
fn extract_cell(row: &PgRow, index: usize, type_name: &str) -> Result<Value> {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::typed(row, index, Value::Bool),
        "INT2" | "SMALLINT" => decode::typed(row, index, |v: i16| Value::Int(v.into())),
        "INT4" | "INT" | "INTEGER" => decode::typed(row, index, |v: i32| Value::Int(v.into())),
        "INT8" | "BIGINT" => decode::typed(row, index, Value::Int),
        "FLOAT4" | "REAL" => decode::typed(row, index, |v: f32| Value::Float(v.into())),
        "FLOAT8" | "DOUBLE PRECISION" => decode::typed(row, index, Value::Float),
        "NUMERIC" => decode::text(row, index, Value::Decimal),
        "DATE" => decode::typed::<_, NaiveDate>(row, index, Value::Date),
        "TIME" => decode::typed::<_, NaiveTime>(row, index, Value::Time),
        "TIMESTAMP" => decode::typed::<_, NaiveDateTime>(row, index, Value::DateTime),
        "TIMESTAMPTZ" => decode::typed(row, index, |v: DateTime<Utc>| {
            Value::DateTime(v.naive_utc())
        }),
        "BYTEA" => decode::typed(row, index, Value::Bytes),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => decode::typed(row, index, Value::Text),
        // For all other types, try to get as string
        _ => decode::fallback(row, index),
    }
}

/// Formats a query error, appending PostgreSQL detail fields when present.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = db_error.message().to_string();

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
