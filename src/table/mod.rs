//! Materialized query results.
//!
//! A [`ResultTable`] is an eager, immutable copy of everything a cursor
//! produced. Nothing holds a live cursor once the table exists.

mod cursor;
mod render;

pub use cursor::{BufferedCursor, CellExtractor, RowCursor, ValuesCursor};
pub use render::{render_text, MAX_COLUMN_WIDTH};

use crate::db::{ColumnInfo, Row, Value};
use crate::error::{DeskError, Result};
use std::time::Duration;
use tracing::debug;

/// A fully materialized, read-only query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
    execution_time: Duration,
}

impl ResultTable {
    /// Copies an entire cursor into memory.
    ///
    /// Column metadata is read once and the row count is taken before the first
    /// row. Any cursor error, a row whose width differs from the column count,
    /// or a row count that disagrees with the rows actually produced aborts
    /// construction; no partial table is ever returned.
    pub fn materialize(cursor: &mut dyn RowCursor) -> Result<Self> {
        let columns = cursor.columns()?;
        let expected_rows = cursor.row_count()?;

        let mut rows = Vec::with_capacity(expected_rows);
        while let Some(row) = cursor.next_row()? {
            if row.len() != columns.len() {
                return Err(DeskError::internal(format!(
                    "Row {} has {} cells but the result has {} columns",
                    rows.len() + 1,
                    row.len(),
                    columns.len()
                )));
            }
            rows.push(row);
        }

        if rows.len() != expected_rows {
            return Err(DeskError::internal(format!(
                "Cursor reported {expected_rows} rows but produced {}",
                rows.len()
            )));
        }

        debug!(
            "Materialized {} rows x {} columns",
            rows.len(),
            columns.len()
        );

        Ok(Self {
            columns,
            rows,
            execution_time: Duration::ZERO,
        })
    }

    /// Builds a table from already extracted values, validating its shape.
    pub fn from_parts(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Result<Self> {
        Self::materialize(&mut ValuesCursor::new(columns, rows))
    }

    /// Sets the execution time.
    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the label of the column at `index`.
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }

    /// Returns the 0-based index of the first column with this label, ignoring case.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns the cell at (`row`, `column`).
    pub fn value_at(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Column metadata.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns true if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Time taken to execute the query.
    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    /// Converts the table to a JSON document with `columns` and `rows`.
    pub fn to_json(&self) -> serde_json::Value {
        let columns: Vec<serde_json::Value> = self
            .columns
            .iter()
            .map(|c| serde_json::json!({ "name": c.name, "type": c.data_type }))
            .collect();
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|r| serde_json::Value::Array(r.iter().map(Value::to_json).collect()))
            .collect();

        serde_json::json!({
            "columns": columns,
            "rows": rows,
            "row_count": self.row_count(),
            "execution_time_ms": self.execution_time.as_millis() as u64,
        })
    }
}
