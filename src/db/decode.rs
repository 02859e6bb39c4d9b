//! Typed cell decoding shared by the sqlx-backed clients.

use super::{ColumnInfo, Value};
use crate::error::{DeskError, Result};
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo};

/// Reads column metadata off a driver row.
pub(crate) fn row_columns<R: Row>(row: &R) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Decodes a cell as `T`, wrapping non-null values with `wrap`.
///
/// A value the driver refuses to decode as `T` (MySQL zero dates, negative
/// TIME values, declared-type mismatches in SQLite) is read back as text.
pub(crate) fn typed<'r, R, T>(row: &'r R, index: usize, wrap: fn(T) -> Value) -> Result<Value>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
    String: Decode<'r, R::Database>,
    Vec<u8>: Decode<'r, R::Database>,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(value) => Ok(value.map(wrap).unwrap_or(Value::Null)),
        Err(typed_error) => {
            fallback(row, index).map_err(|_| DeskError::query(typed_error.to_string()))
        }
    }
}

/// Decodes a cell through its text form regardless of the column type.
pub(crate) fn text<'r, R>(row: &'r R, index: usize, wrap: fn(String) -> Value) -> Result<Value>
where
    R: Row,
    usize: ColumnIndex<R>,
    String: Decode<'r, R::Database>,
{
    row.try_get_unchecked::<Option<String>, _>(index)
        .map(|value| value.map(wrap).unwrap_or(Value::Null))
        .map_err(|e| DeskError::query(e.to_string()))
}

/// Last resort for unknown types: text if it is valid UTF-8, raw bytes otherwise.
pub(crate) fn fallback<'r, R>(row: &'r R, index: usize) -> Result<Value>
where
    R: Row,
    usize: ColumnIndex<R>,
    String: Decode<'r, R::Database>,
    Vec<u8>: Decode<'r, R::Database>,
{
    if let Ok(value) = text(row, index, Value::Text) {
        return Ok(value);
    }
    row.try_get_unchecked::<Option<Vec<u8>>, _>(index)
        .map(|value| value.map(Value::Bytes).unwrap_or(Value::Null))
        .map_err(|e| DeskError::query(e.to_string()))
}
