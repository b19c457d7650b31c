//! Row mapping traits and utilities

use crate::error::{QueryError, QueryResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Trait for converting a database row into a Rust struct.
///
/// # Example
///
/// ```ignore
/// use pgquery::{FromRow, QueryResult, RowExt};
/// use tokio_postgres::Row;
///
/// struct Device {
///     id: i64,
///     token: String,
/// }
///
/// impl FromRow for Device {
///     fn from_row(row: &Row) -> QueryResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             token: row.try_get_column("token")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> QueryResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning QueryError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a>;

    /// Try to get a column value by position, returning QueryError::Decode on failure
    fn try_get_index<T>(&self, idx: usize) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| QueryError::decode(column, e.to_string()))
    }

    fn try_get_index<T>(&self, idx: usize) -> QueryResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(idx)
            .map_err(|e| QueryError::decode(idx.to_string(), e.to_string()))
    }
}
