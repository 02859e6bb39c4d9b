//! Cursors over driver result sets.

use crate::db::{ColumnInfo, Row, Value};
use crate::error::{DeskError, Result};

/// A scrollable cursor over the rows of a query result.
///
/// Implementations expose column metadata, the total row count, and forward
/// iteration with typed cell extraction. Any error is fatal to materialization.
pub trait RowCursor {
    /// Column metadata, read once before any row.
    fn columns(&mut self) -> Result<Vec<ColumnInfo>>;

    /// Total number of rows. Must not change the iteration position.
    fn row_count(&mut self) -> Result<usize>;

    /// Advances to the next row and extracts all of its cells.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Extracts the cell at `index` (with driver type name `type_name`) from a row.
pub type CellExtractor<R> = fn(&R, usize, &str) -> Result<Value>;

/// A cursor over rows already fetched from the driver.
///
/// sqlx hands back a fully buffered `Vec` of rows, so the buffer length
/// stands in for a scrollable cursor's last-row position.
pub struct BufferedCursor<R> {
    columns: Vec<ColumnInfo>,
    rows: Vec<R>,
    position: usize,
    extract: CellExtractor<R>,
}

impl<R> BufferedCursor<R> {
    /// Creates a cursor over driver rows.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<R>, extract: CellExtractor<R>) -> Self {
        Self {
            columns,
            rows,
            position: 0,
            extract,
        }
    }
}

impl<R> RowCursor for BufferedCursor<R> {
    fn columns(&mut self) -> Result<Vec<ColumnInfo>> {
        Ok(self.columns.clone())
    }

    fn row_count(&mut self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        let Some(row) = self.rows.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        let mut cells = Vec::with_capacity(self.columns.len());
        for (index, column) in self.columns.iter().enumerate() {
            let value = (self.extract)(row, index, &column.data_type).map_err(|e| {
                DeskError::query(format!(
                    "Error reading column '{}' of row {}: {e}",
                    column.name, self.position
                ))
            })?;
            cells.push(value);
        }
        Ok(Some(cells))
    }
}

/// A cursor over in-memory values.
///
/// Used by the mock client and by tests to drive the materializer.
#[derive(Debug, Clone, Default)]
pub struct ValuesCursor {
    columns: Vec<ColumnInfo>,
    rows: std::vec::IntoIter<Row>,
    total: usize,
}

impl ValuesCursor {
    /// Creates a cursor that yields the given rows in order.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let total = rows.len();
        Self {
            columns,
            rows: rows.into_iter(),
            total,
        }
    }
}

impl RowCursor for ValuesCursor {
    fn columns(&mut self) -> Result<Vec<ColumnInfo>> {
        Ok(self.columns.clone())
    }

    fn row_count(&mut self) -> Result<usize> {
        Ok(self.total)
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}
