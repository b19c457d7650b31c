//! Execution handlers: the seam between a composed query and concrete records.
//!
//! A [`Handler`] receives the executor and the [`ComposedQuery`] and may do arbitrary
//! work (run the query, map rows, load relations with follow-up queries). Two handlers
//! cover the common cases:
//!
//! - [`RowHandler`]: map each row with [`FromRow`].
//! - [`JsonHandler`]: decode column 0 as JSON (pairs with JSON wrap mode).
//!
//! # Example
//!
//! ```ignore
//! use pgquery::{async_trait, ComposedQuery, Executor, Fetched, Handler, QueryResult};
//!
//! struct UsersWithDevices;
//!
//! #[async_trait]
//! impl Handler<User> for UsersWithDevices {
//!     async fn handle(&self, conn: &dyn Executor, query: &ComposedQuery) -> QueryResult<Fetched<User>> {
//!         let mut users: Vec<User> = query.fetch_all_as(conn).await?;
//!         // ... load devices for `users` with a second query ...
//!         Ok(Fetched::Many(users))
//!     }
//! }
//! ```

use crate::client::Executor;
use crate::composed::ComposedQuery;
use crate::error::{QueryError, QueryResult};
use crate::fetched::Fetched;
use crate::row::FromRow;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// Turns a composed query into records.
#[async_trait]
pub trait Handler<T>: Send + Sync {
    /// Execute `query` against `conn` and return the records it produced.
    async fn handle(&self, conn: &dyn Executor, query: &ComposedQuery) -> QueryResult<Fetched<T>>;
}

/// Maps every row with [`FromRow`].
pub struct RowHandler<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> RowHandler<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for RowHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Handler<T> for RowHandler<T>
where
    T: FromRow + Send + 'static,
{
    async fn handle(&self, conn: &dyn Executor, query: &ComposedQuery) -> QueryResult<Fetched<T>> {
        query.fetch_all_as(conn).await.map(Fetched::Many)
    }
}

/// Decodes column 0 of every row as JSON into `T`.
///
/// A row holding a JSON array that is not itself a `T` is treated as a sequence of `T`.
pub struct JsonHandler<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonHandler<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Handler<T> for JsonHandler<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn handle(&self, conn: &dyn Executor, query: &ComposedQuery) -> QueryResult<Fetched<T>> {
        let rows = query.fetch_rows(conn).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let value: Value = row
                .try_get(0)
                .map_err(|e| QueryError::decode("0", e.to_string()))?;
            records.extend(decode_json::<T>(value)?.into_vec());
        }
        Ok(Fetched::Many(records))
    }
}

/// Decode a JSON value into `T`, or into a sequence of `T` when it is an array.
///
/// Fails with [`QueryError::TypeMismatch`] naming `T` and the JSON shape.
pub fn decode_json<T: DeserializeOwned>(value: Value) -> QueryResult<Fetched<T>> {
    let direct = match T::deserialize(&value) {
        Ok(record) => return Ok(Fetched::One(record)),
        Err(err) => err,
    };

    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| T::deserialize(item).map_err(|err| mismatch::<T>(item, &err)))
            .collect::<QueryResult<Vec<T>>>()
            .map(Fetched::Many),
        other => Err(mismatch::<T>(&other, &direct)),
    }
}

fn mismatch<T>(value: &Value, err: &serde_json::Error) -> QueryError {
    let shape = match value {
        Value::Null => "JSON null",
        Value::Bool(_) => "JSON boolean",
        Value::Number(_) => "JSON number",
        Value::String(_) => "JSON string",
        Value::Array(_) => "JSON array",
        Value::Object(_) => "JSON object",
    };
    QueryError::type_mismatch(std::any::type_name::<T>(), format!("{shape} ({err})"))
}
