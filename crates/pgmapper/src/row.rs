//! Decoding `tokio_postgres::Row` into [`Record`]s.

use crate::error::{MapperError, MapperResult};
use crate::value::{Record, Value};
use tokio_postgres::Row;

/// Decode the value at column `idx`.
///
/// Every column type decodes; see the [`FromSql`](tokio_postgres::types::FromSql)
/// impl on [`Value`] for the mapping. Malformed data is a decode error.
pub fn column_value(row: &Row, idx: usize) -> MapperResult<Value> {
    row.try_get::<_, Value>(idx)
        .map_err(|e| MapperError::decode(row.columns()[idx].name(), e.to_string()))
}

/// Decode a whole row, keyed by column name.
pub fn record_from_row(row: &Row) -> MapperResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.insert(column.name(), column_value(row, idx)?);
    }
    Ok(record)
}

/// Decode every column of a row positionally.
pub fn values_from_row(row: &Row) -> MapperResult<Vec<Value>> {
    (0..row.len()).map(|idx| column_value(row, idx)).collect()
}

/// Decode a result set.
pub fn records_from_rows(rows: &[Row]) -> MapperResult<Vec<Record>> {
    rows.iter().map(record_from_row).collect()
}
