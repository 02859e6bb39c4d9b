//! Mock database clients for testing.
//!
//! Provides in-memory implementations for headless testing of the session,
//! executor and application layers.

use super::{ColumnInfo, DatabaseBackend, DatabaseClient, Value};
use crate::error::{DeskError, Result};
use crate::table::ResultTable;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock database client that returns predefined results and records
/// every statement it receives.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    results: HashMap<String, ResultTable>,
    rows_affected: u64,
    executed: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `table` whenever exactly `sql` is queried.
    pub fn with_result(mut self, sql: impl Into<String>, table: ResultTable) -> Self {
        self.results.insert(sql.into(), table);
        self
    }

    /// Sets the row count reported for modifying statements.
    pub fn with_rows_affected(mut self, rows: u64) -> Self {
        self.rows_affected = rows;
        self
    }

    /// Shared log of executed statements, readable after the client is boxed.
    pub fn statement_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    /// Shared flag set when the client is closed.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn record(&self, sql: &str) {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
    }

    fn result_for(&self, sql: &str) -> Result<ResultTable> {
        if let Some(table) = self.results.get(sql) {
            return Ok(table.clone());
        }
        // Unknown statements echo back in a one-cell table.
        ResultTable::from_parts(
            vec![ColumnInfo::new("result", "text")],
            vec![vec![Value::Text(format!("Mock result for: {sql}"))]],
        )
        .map(|table| table.with_execution_time(Duration::from_millis(1)))
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, sql: &str) -> Result<ResultTable> {
        self.record(sql);
        self.result_for(sql)
    }

    async fn execute_update(&self, sql: &str) -> Result<u64> {
        self.record(sql);
        Ok(self.rows_affected)
    }

    async fn query_with(&self, sql: &str, _params: &[Value]) -> Result<ResultTable> {
        self.record(sql);
        self.result_for(sql)
    }

    async fn execute_with(&self, sql: &str, _params: &[Value]) -> Result<u64> {
        self.record(sql);
        Ok(self.rows_affected)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A database client whose every statement fails with the same driver message.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client failing with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn execute_query(&self, _sql: &str) -> Result<ResultTable> {
        Err(DeskError::query(self.message.clone()))
    }

    async fn execute_update(&self, _sql: &str) -> Result<u64> {
        Err(DeskError::query(self.message.clone()))
    }

    async fn query_with(&self, _sql: &str, _params: &[Value]) -> Result<ResultTable> {
        Err(DeskError::query(self.message.clone()))
    }

    async fn execute_with(&self, _sql: &str, _params: &[Value]) -> Result<u64> {
        Err(DeskError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
