use crate::client::Executor;
use crate::config::SqlLogConfig;
use crate::error::QueryResult;
use crate::param::{BoundValue, Param};
use crate::placeholder;
use crate::row::FromRow;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Query text plus its bound values, as handed to a [`Handler`](crate::Handler).
///
/// The text uses `?` for positional and `@name` for named placeholders. `values` holds the
/// positional values in attachment order followed by the named mapping, if any, as one
/// trailing entry.
#[derive(Debug, Clone)]
pub struct ComposedQuery {
    pub(crate) name: Option<String>,
    pub(crate) sql: String,
    pub(crate) values: Vec<BoundValue>,
    pub(crate) sql_log: SqlLogConfig,
}

impl ComposedQuery {
    /// Compose a query directly, without a builder.
    pub fn new(sql: impl Into<String>, values: Vec<BoundValue>) -> Self {
        Self {
            name: None,
            sql: sql.into(),
            values,
            sql_log: SqlLogConfig::default(),
        }
    }

    /// The SQL text with `?` / `@name` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound values, positional first, then the named mapping.
    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }

    /// Name of the [`QuerySpec`](crate::QuerySpec) this was built from.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rewrite placeholders to `$n` and order parameters to match.
    pub fn render(&self) -> QueryResult<RenderedQuery> {
        let (sql, params) = placeholder::render(&self.sql, &self.values)?;
        Ok(RenderedQuery { sql, params })
    }

    /// The SQL with values inlined as literals (for logs and debugging only).
    pub fn explain(&self) -> String {
        placeholder::explain(&self.sql, &self.values)
    }

    /// Execute the query and return all rows.
    pub async fn fetch_rows(&self, conn: &dyn Executor) -> QueryResult<Vec<Row>> {
        let rendered = self.render()?;
        self.log("data", &rendered);
        conn.fetch_rows(&rendered.sql, &rendered.params_ref()).await
    }

    /// Execute the query and return all rows mapped to `T`.
    pub async fn fetch_all_as<T: FromRow>(&self, conn: &dyn Executor) -> QueryResult<Vec<T>> {
        let rows = self.fetch_rows(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    pub(crate) fn log(&self, kind: &'static str, rendered: &RenderedQuery) {
        self.sql_log.emit(
            self.name.as_deref().unwrap_or("-"),
            kind,
            &rendered.sql,
            rendered.params.len(),
        );
    }
}

/// A query with PostgreSQL `$n` placeholders, ready for the driver.
#[derive(Debug, Clone)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl RenderedQuery {
    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}
