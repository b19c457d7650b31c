use tracing::Level;

/// What pagination does when the count query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountErrorPolicy {
    /// Report a total of zero, set [`Pagination::count_failed`](crate::Pagination) and
    /// emit a warning. The page of records is still returned.
    #[default]
    Absorb,
    /// Fail the whole pagination call with the count error.
    Propagate,
}

/// SQL logging configuration.
///
/// Statements are emitted as `tracing` events under the `pgquery.sql` target
/// **before** they are sent to the backend.
#[derive(Debug, Clone)]
pub struct SqlLogConfig {
    /// Whether statements are logged at all.
    pub enabled: bool,
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Turn statement logging off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn emit(&self, query: &str, kind: &'static str, sql: &str, param_count: usize) {
        if !self.enabled {
            return;
        }

        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    _ => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "pgquery.sql",
            query,
            kind,
            param_count,
            sql = %sql,
        );
    }
}

/// Per-query configuration.
///
/// Attach it to a [`QuerySpec`](crate::QuerySpec) with `config(...)`, or override it for a
/// single execution with [`QueryBuilder::config`](crate::QueryBuilder::config).
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Count-query failure handling during pagination.
    pub count_errors: CountErrorPolicy,
    /// SQL statement logging.
    pub sql_log: SqlLogConfig,
    /// CTE alias used when wrapping rows as JSON.
    pub json_alias: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            count_errors: CountErrorPolicy::default(),
            sql_log: SqlLogConfig::default(),
            json_alias: "alias".to_string(),
        }
    }
}

impl QueryConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count-query failure policy.
    pub fn with_count_errors(mut self, policy: CountErrorPolicy) -> Self {
        self.count_errors = policy;
        self
    }

    /// Set the SQL logging configuration.
    pub fn with_sql_log(mut self, sql_log: SqlLogConfig) -> Self {
        self.sql_log = sql_log;
        self
    }

    /// Set the alias used by JSON wrap mode.
    pub fn with_json_alias(mut self, alias: impl Into<String>) -> Self {
        self.json_alias = alias.into();
        self
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
