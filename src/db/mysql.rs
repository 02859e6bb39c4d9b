//! MySQL database client implementation.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient` trait
//! for MySQL and MariaDB servers using sqlx.

use super::{
    decode, query_error_message, with_retry, ColumnInfo, DatabaseBackend, DatabaseClient, Value,
    ACQUIRE_TIMEOUT,
};
use crate::config::ConnectionConfig;
use crate::error::{DeskError, Result};
use crate::table::{BufferedCursor, ResultTable};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Executor, MySql, Statement, TypeInfo};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// MySQL database client holding a single-connection session.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
}

impl MySqlClient {
    /// Opens a session, making at most `attempts` connection attempts.
    pub async fn connect(config: &ConnectionConfig, attempts: u32) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(&config.url)
            .map_err(|e| DeskError::config(format!("Invalid MySQL URL: {e}")))?
            .username(&config.user)
            .password(&config.password);

        let pool = with_retry(config, attempts, || {
            MySqlPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect_with(options.clone())
        })
        .await?;

        Ok(Self { pool })
    }

    /// Creates a new MySqlClient from an existing connection pool.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Column metadata for a statement that produced no rows.
    ///
    /// Best effort: statements the server will not prepare yield no columns.
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
        rows: Vec<MySqlRow>,
        started: Instant,
    ) -> Result<ResultTable> {
        let mut cursor = BufferedCursor::new(columns, rows, extract_cell);
        Ok(ResultTable::materialize(&mut cursor)?.with_execution_time(started.elapsed()))
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
    }

    async fn execute_query(&self, sql: &str) -> Result<ResultTable> {
        let started = Instant::now();

        // Text protocol: SHOW and DESC cannot be prepared.
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
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
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

/// Converts a single column value from a MySqlRow to our Value type.
fn extract_cell(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    let type_name = type_name.to_uppercase();

    if type_name.ends_with("UNSIGNED") {
        return decode::typed(row, index, |v: u64| Value::from(v));
    }

    match type_name.as_str() {
        "BOOLEAN" => decode::typed(row, index, Value::Bool),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            decode::typed(row, index, Value::Int)
        }
        "YEAR" => decode::typed(row, index, |v: u16| Value::Int(v.into())),
        "FLOAT" => decode::typed(row, index, |v: f32| Value::Float(v.into())),
        "DOUBLE" => decode::typed(row, index, Value::Float),
        "DECIMAL" => decode::text(row, index, Value::Decimal),
        "DATE" => decode::typed::<_, NaiveDate>(row, index, Value::Date),
        "TIME" => decode::typed::<_, NaiveTime>(row, index, Value::Time),
        "DATETIME" | "TIMESTAMP" => decode::typed::<_, NaiveDateTime>(row, index, Value::DateTime),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            decode::typed(row, index, Value::Bytes)
        }
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET"
        | "JSON" => decode::typed(row, index, Value::Text),
        _ => decode::fallback(row, index),
    }
}
