use crate::config::QueryConfig;
use crate::handler::Handler;
use std::fmt;
use std::sync::Arc;

/// Declaration of a named, reusable query.
///
/// A `QuerySpec` holds the base SELECT text plus optional count / GROUP BY / HAVING /
/// ORDER BY fragments and the [`Handler`] that turns rows into `T`. It is built once and
/// shared read-only by every [`QueryBuilder`](crate::QueryBuilder) created from it.
///
/// # Example
///
/// ```ignore
/// use pgquery::{QuerySpec, RowHandler};
///
/// let devices = QuerySpec::new("SELECT d.* FROM devices d")
///     .named("devices")
///     .count_sql("SELECT 1 FROM devices d")
///     .order_by("d.id")
///     .handler(RowHandler::<Device>::new());
/// ```
#[must_use]
pub struct QuerySpec<T> {
    pub(crate) name: Option<String>,
    pub(crate) raw_sql: String,
    pub(crate) count_sql: String,
    pub(crate) order_by: String,
    pub(crate) group_by: String,
    pub(crate) having: String,
    pub(crate) wrap_json: bool,
    pub(crate) handler: Option<Arc<dyn Handler<T>>>,
    pub(crate) config: QueryConfig,
}

impl<T> QuerySpec<T> {
    /// Declare a query from its base SELECT text.
    pub fn new(raw_sql: impl Into<String>) -> Self {
        Self {
            name: None,
            raw_sql: raw_sql.into(),
            count_sql: String::new(),
            order_by: String::new(),
            group_by: String::new(),
            having: String::new(),
            wrap_json: false,
            handler: None,
            config: QueryConfig::default(),
        }
    }

    /// Declare a query with a dedicated count SELECT.
    pub fn with_count_sql(raw_sql: impl Into<String>, count_sql: impl Into<String>) -> Self {
        Self::new(raw_sql).count_sql(count_sql)
    }

    /// Name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the base SELECT text.
    pub fn raw_sql(mut self, sql: impl Into<String>) -> Self {
        self.raw_sql = sql.into();
        self
    }

    /// SELECT used as the base of the count query. Empty means "derive from the base SQL".
    pub fn count_sql(mut self, sql: impl Into<String>) -> Self {
        self.count_sql = sql.into();
        self
    }

    /// Default ORDER BY fragment (without the keywords).
    pub fn order_by(mut self, sql: impl Into<String>) -> Self {
        self.order_by = sql.into();
        self
    }

    /// Default GROUP BY fragment (without the keywords).
    pub fn group_by(mut self, sql: impl Into<String>) -> Self {
        self.group_by = sql.into();
        self
    }

    /// Default HAVING fragment (without the keyword).
    pub fn having(mut self, sql: impl Into<String>) -> Self {
        self.having = sql.into();
        self
    }

    /// Return each record as a single JSON value.
    pub fn wrap_json(mut self, wrap: bool) -> Self {
        self.wrap_json = wrap;
        self
    }

    /// Handler used by `paginate`, `fetch_one` and `fetch_many`.
    pub fn handler<H: Handler<T> + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Handler from an `Arc`, for sharing one handler between specs.
    pub fn handler_arc(mut self, handler: Arc<dyn Handler<T>>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Execution configuration.
    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sql(&self) -> &str {
        &self.raw_sql
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl<T> fmt::Debug for QuerySpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("name", &self.name)
            .field("raw_sql", &self.raw_sql)
            .field("count_sql", &self.count_sql)
            .field("order_by", &self.order_by)
            .field("group_by", &self.group_by)
            .field("having", &self.having)
            .field("wrap_json", &self.wrap_json)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
