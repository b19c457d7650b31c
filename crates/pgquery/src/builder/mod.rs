//! Per-invocation query composition.
//!
//! A [`QueryBuilder`] is seeded from a [`QuerySpec`], configured through a consuming
//! fluent chain, and spent by exactly one execution method (`paginate`, `fetch_one`,
//! `fetch_many`, `fetch_rows`, ...). Ownership is the single-use guard: every execution
//! method takes `self`. Clone a builder to fork it explicitly.
//!
//! # Example
//!
//! ```ignore
//! use pgquery::{named, raw, QueryBuilder};
//!
//! let page = QueryBuilder::new(&USERS)
//!     .filter(raw("c.name = ?").bind("Test Company 1"))
//!     .filter("u.id IS NOT NULL")
//!     .order_by("u.id DESC")
//!     .limit(20)
//!     .page(2)
//!     .paginate(&client)
//!     .await?;
//! ```

mod assemble;

pub use assemble::{Assembled, offset_for};
pub(crate) use assemble::count_wrap;

use crate::client::Executor;
use crate::composed::ComposedQuery;
use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::fetched::{Fetched, project_one};
use crate::handler::Handler;
use crate::param::{BoundValue, NamedParams, Param, Predicate};
use crate::query_spec::QuerySpec;
use crate::row::{FromRow, RowExt};
use assemble::Clauses;
use std::fmt;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, ToSql};

/// Fluent, single-use composition state for one execution of a [`QuerySpec`].
#[must_use]
pub struct QueryBuilder<'s, T> {
    pub(crate) spec: &'s QuerySpec<T>,
    pub(crate) sql: String,
    pub(crate) count_sql: String,
    pub(crate) positional: Vec<Param>,
    pub(crate) named: NamedParams,
    pub(crate) has_where: bool,
    pub(crate) order_by: String,
    pub(crate) group_by: String,
    pub(crate) having: String,
    pub(crate) limit: i64,
    pub(crate) page: i64,
    pub(crate) wrap_json: bool,
    pub(crate) config: QueryConfig,
}

impl<'s, T> QueryBuilder<'s, T> {
    /// Start a builder from the `QuerySpec`'s defaults.
    pub fn new(spec: &'s QuerySpec<T>) -> Self {
        Self {
            spec,
            sql: spec.raw_sql.clone(),
            count_sql: spec.count_sql.clone(),
            positional: Vec::new(),
            named: NamedParams::new(),
            has_where: false,
            order_by: spec.order_by.clone(),
            group_by: spec.group_by.clone(),
            having: spec.having.clone(),
            limit: 0,
            page: 0,
            wrap_json: spec.wrap_json,
            config: spec.config.clone(),
        }
    }

    // ==================== Configuration ====================

    /// Attach a predicate.
    ///
    /// Raw fragments are appended to the SQL, joined with `WHERE` the first time and
    /// `AND` afterwards, and to the count SQL too when the `QuerySpec` declares one. Their values
    /// are appended to the positional list. Named mappings and named arguments only
    /// populate the named values; later assignments to a name win.
    pub fn filter(mut self, predicate: impl Into<Predicate>) -> Self {
        match predicate.into() {
            Predicate::Named(map) => self.named.extend(map),
            Predicate::Arg(arg) => {
                self.named.insert(arg.name, arg.value);
            }
            Predicate::Raw(fragment) => {
                let keyword = if self.has_where { " AND " } else { " WHERE " };
                self.sql.push_str(keyword);
                self.sql.push_str(&fragment.sql);
                if !self.count_sql.is_empty() {
                    self.count_sql.push_str(keyword);
                    self.count_sql.push_str(&fragment.sql);
                }
                self.has_where = true;
                self.positional.extend(fragment.params);
            }
        }
        self
    }

    /// Apply a reusable chunk of configuration.
    ///
    /// ```ignore
    /// fn active(b: QueryBuilder<'_, User>) -> QueryBuilder<'_, User> {
    ///     b.filter("u.deleted_at IS NULL")
    /// }
    /// QueryBuilder::new(&USERS).filter_with(active);
    /// ```
    pub fn filter_with<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self)
    }

    /// Attach a raw condition with already erased values.
    pub fn where_raw(self, sql: impl Into<String>, params: impl IntoIterator<Item = Param>) -> Self {
        let fragment = params
            .into_iter()
            .fold(crate::param::raw(sql), |f, p| f.bind_param(p));
        self.filter(fragment)
    }

    /// Bind a value to `@name`.
    pub fn bind_named<V>(mut self, name: impl Into<String>, value: V) -> Self
    where
        V: ToSql + Sync + Send + 'static,
    {
        self.named.insert(name.into(), Arc::new(value));
        self
    }

    /// Replace the ORDER BY fragment.
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    /// Replace the ORDER BY fragment with several fragments joined by `,`.
    ///
    /// An empty list leaves the current ordering in place.
    pub fn order_by_all<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = fragments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        if !joined.is_empty() {
            self.order_by = joined;
        }
        self
    }

    /// Replace the GROUP BY fragment.
    pub fn group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = group_by.into();
        self
    }

    /// Replace the HAVING fragment.
    pub fn having(mut self, having: impl Into<String>) -> Self {
        self.having = having.into();
        self
    }

    /// Page size. `0` (the default) means no LIMIT.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// 1-based page number. `0` (the default) means no OFFSET; pagination treats values
    /// below 1 as 1.
    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    /// Return each record as one `jsonb` column.
    pub fn wrap_json(mut self, wrap: bool) -> Self {
        self.wrap_json = wrap;
        self
    }

    /// Override the `QuerySpec`'s configuration for this execution.
    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    // ==================== Inspection ====================

    /// Current SQL text with predicates, before clause assembly.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The `QuerySpec` this builder was created from.
    pub fn spec(&self) -> &'s QuerySpec<T> {
        self.spec
    }

    /// Whether a raw predicate has already opened the WHERE clause.
    pub fn has_where(&self) -> bool {
        self.has_where
    }

    /// Bound values: positional values in attachment order, then the named mapping as one
    /// trailing entry when non-empty.
    pub fn values(&self) -> Vec<BoundValue> {
        let mut values: Vec<BoundValue> = self
            .positional
            .iter()
            .cloned()
            .map(BoundValue::Positional)
            .collect();
        if !self.named.is_empty() {
            values.push(BoundValue::Named(self.named.clone()));
        }
        values
    }

    /// Final data and count SQL for the current state.
    pub fn assemble(&self) -> Assembled {
        assemble::assemble(Clauses {
            sql: &self.sql,
            count_sql: &self.count_sql,
            group_by: &self.group_by,
            having: &self.having,
            order_by: &self.order_by,
            limit: self.limit,
            page: self.page,
            wrap_json: self.wrap_json.then_some(self.config.json_alias.as_str()),
        })
    }

    /// The data SQL with bound values inlined. For debugging; never executed.
    pub fn explain_sql(&self) -> String {
        self.compose(self.assemble().data_sql).explain()
    }

    pub(crate) fn compose(&self, sql: String) -> ComposedQuery {
        ComposedQuery {
            name: self.spec.name.clone(),
            sql,
            values: self.values(),
            sql_log: self.config.sql_log.clone(),
        }
    }

    /// The spec's handler. Running a handler-driven method without one is a programming
    /// error.
    pub(crate) fn spec_handler(&self) -> &'s dyn Handler<T> {
        match self.spec.handler.as_deref() {
            Some(handler) => handler,
            None => panic!(
                "query `{}` has no handler: set one on the QuerySpec or pass one at call time",
                self.spec.name.as_deref().unwrap_or("-")
            ),
        }
    }

    // ==================== Execution ====================

    /// Run the data query through `handler` and return what it produced.
    async fn run(self, conn: &dyn Executor, handler: &dyn Handler<T>) -> QueryResult<Fetched<T>> {
        let query = self.compose(self.assemble().data_sql);
        handler.handle(conn, &query).await
    }

    /// Fetch a single record with the `QuerySpec`'s handler. LIMIT is forced to 1.
    ///
    /// Zero records is [`QueryError::NotFound`].
    pub async fn fetch_one(self, conn: &dyn Executor) -> QueryResult<T> {
        let handler = self.spec_handler();
        self.fetch_one_with(conn, handler).await
    }

    /// [`fetch_one`](Self::fetch_one) with a call-time handler.
    pub async fn fetch_one_with(
        self,
        conn: &dyn Executor,
        handler: &dyn Handler<T>,
    ) -> QueryResult<T> {
        self.limit(1).run(conn, handler).await?.first()
    }

    /// Fetch a single record into `dest`. `dest` is untouched on error.
    pub async fn fetch_one_into(self, conn: &dyn Executor, dest: &mut T) -> QueryResult<()> {
        let handler = self.spec_handler();
        let fetched = self.limit(1).run(conn, handler).await?;
        project_one(dest, fetched)
    }

    /// Fetch every record with the `QuerySpec`'s handler.
    pub async fn fetch_many(self, conn: &dyn Executor) -> QueryResult<Vec<T>> {
        let handler = self.spec_handler();
        self.fetch_many_with(conn, handler).await
    }

    /// [`fetch_many`](Self::fetch_many) with a call-time handler.
    pub async fn fetch_many_with(
        self,
        conn: &dyn Executor,
        handler: &dyn Handler<T>,
    ) -> QueryResult<Vec<T>> {
        Ok(self.run(conn, handler).await?.into_vec())
    }

    /// Execute the data query directly, bypassing any handler.
    pub async fn fetch_rows(self, conn: &dyn Executor) -> QueryResult<Vec<Row>> {
        let query = self.compose(self.assemble().data_sql);
        let rendered = query.render()?;
        query.log("scan", &rendered);
        conn.fetch_rows(&rendered.sql, &rendered.params_ref()).await
    }

    /// Execute the data query and map every row with [`FromRow`].
    pub async fn fetch_all_as<U: FromRow>(self, conn: &dyn Executor) -> QueryResult<Vec<U>> {
        let rows = self.fetch_rows(conn).await?;
        rows.iter().map(U::from_row).collect()
    }

    /// Execute the data query and map the first row. Zero rows is
    /// [`QueryError::NotFound`].
    pub async fn scan_one<U: FromRow>(self, conn: &dyn Executor) -> QueryResult<U> {
        let rows = self.fetch_rows(conn).await?;
        match rows.first() {
            Some(row) => U::from_row(row),
            None => Err(QueryError::not_found("Expected one row, got none")),
        }
    }

    /// Column 0 of the first row. Zero rows is [`QueryError::NotFound`].
    pub async fn fetch_scalar<V>(self, conn: &dyn Executor) -> QueryResult<V>
    where
        V: for<'a> FromSql<'a>,
    {
        let rows = self.fetch_rows(conn).await?;
        let row = rows
            .first()
            .ok_or_else(|| QueryError::not_found("Expected one row, got none"))?;
        row.try_get_index(0)
    }
}

impl<T> Clone for QueryBuilder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec,
            sql: self.sql.clone(),
            count_sql: self.count_sql.clone(),
            positional: self.positional.clone(),
            named: self.named.clone(),
            has_where: self.has_where,
            order_by: self.order_by.clone(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            limit: self.limit,
            page: self.page,
            wrap_json: self.wrap_json,
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("name", &self.spec.name)
            .field("sql", &self.sql)
            .field("count_sql", &self.count_sql)
            .field("positional", &self.positional.len())
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .field("order_by", &self.order_by)
            .field("group_by", &self.group_by)
            .field("having", &self.having)
            .field("limit", &self.limit)
            .field("page", &self.page)
            .field("wrap_json", &self.wrap_json)
            .finish()
    }
}

#[cfg(test)]
mod tests;
