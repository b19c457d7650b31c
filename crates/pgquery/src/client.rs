//! Database client abstractions.
//!
//! [`GenericClient`] is the typed backend seam implemented for `tokio-postgres` clients,
//! transactions and pooled connections. [`Executor`] is its object-safe facade: query
//! handlers receive a `&dyn Executor`, so one [`QuerySpec`](crate::QuerySpec) can be run
//! against any backend.

use crate::error::{QueryError, QueryResult};
use async_trait::async_trait;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// This allows query execution to accept either a direct client connection
/// or a transaction.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = QueryResult<Vec<Row>>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`QueryError::NotFound`]
    /// - 1 row: returns that row
    /// - multiple rows: returns the first row (does **not** error)
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = QueryResult<Row>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            rows.into_iter()
                .next()
                .ok_or_else(|| QueryError::not_found("Expected one row, got none"))
        }
    }

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = QueryResult<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = QueryResult<u64>> + Send;

    /// Execute a query returning a single integer in column 0 of the first row.
    ///
    /// Used for `SELECT COUNT(1) ...` statements. A missing row counts as zero.
    fn query_count(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = QueryResult<i64>> + Send {
        async move {
            match self.query_opt(sql, params).await? {
                Some(row) => row
                    .try_get::<_, i64>(0)
                    .map_err(|e| QueryError::decode("0", e.to_string())),
                None => Ok(0),
            }
        }
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<Vec<Row>> {
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(QueryError::from_db_error)
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> QueryResult<Option<Row>> {
        tokio_postgres::Client::query_opt(self, sql, params)
            .await
            .map_err(QueryError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<u64> {
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map_err(QueryError::from_db_error)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<Vec<Row>> {
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(QueryError::from_db_error)
    }

    async fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> QueryResult<Option<Row>> {
        tokio_postgres::Transaction::query_opt(self, sql, params)
            .await
            .map_err(QueryError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, params)
            .await
            .map_err(QueryError::from_db_error)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        GenericClient::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<u64> {
        GenericClient::execute(&**self, sql, params).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::ClientWrapper {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<Vec<Row>> {
        GenericClient::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<u64> {
        GenericClient::execute(&**self, sql, params).await
    }
}

/// Object-safe execution backend handed to query handlers.
///
/// Every [`GenericClient`] is an `Executor`; test doubles usually implement
/// [`GenericClient`] and get this for free.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute a query and return all rows.
    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> QueryResult<Vec<Row>>;

    /// Execute a query returning a single integer (count path).
    async fn fetch_count(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<i64>;
}

#[async_trait]
impl<C: GenericClient> Executor for C {
    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> QueryResult<Vec<Row>> {
        GenericClient::query(self, sql, params).await
    }

    async fn fetch_count(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> QueryResult<i64> {
        GenericClient::query_count(self, sql, params).await
    }
}
