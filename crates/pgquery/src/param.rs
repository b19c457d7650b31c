//! Bound values and WHERE predicates.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A type-erased bound parameter value.
pub type Param = Arc<dyn ToSql + Sync + Send>;

/// Named parameter values, keyed by name. Keys are unique.
pub type NamedParams = BTreeMap<String, Param>;

/// Erase a value into a [`Param`].
pub fn param<T>(value: T) -> Param
where
    T: ToSql + Sync + Send + 'static,
{
    Arc::new(value)
}

/// A single named argument, referenced from SQL text as `@name`.
#[derive(Debug, Clone)]
pub struct NamedArg {
    pub name: String,
    pub value: Param,
}

/// Create a [`NamedArg`].
///
/// ```ignore
/// QueryBuilder::new(&spec).filter(pgquery::named("company", "Test Company 1"))
/// ```
pub fn named<T>(name: impl Into<String>, value: T) -> NamedArg
where
    T: ToSql + Sync + Send + 'static,
{
    NamedArg {
        name: name.into(),
        value: Arc::new(value),
    }
}

/// A raw SQL condition with `?` placeholders and its positional values.
#[derive(Debug, Clone)]
#[must_use]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Param>,
}

/// Start a raw SQL condition.
///
/// ```ignore
/// pgquery::raw("c.name = ?").bind("Test Company 1")
/// ```
pub fn raw(sql: impl Into<String>) -> Fragment {
    Fragment {
        sql: sql.into(),
        params: Vec::new(),
    }
}

impl Fragment {
    /// Bind the value for the next `?` placeholder.
    pub fn bind<T>(mut self, value: T) -> Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.params.push(Arc::new(value));
        self
    }

    /// Bind an already erased value.
    pub fn bind_param(mut self, value: Param) -> Self {
        self.params.push(value);
        self
    }
}

/// Anything that can be attached to a query's WHERE clause.
///
/// Only [`Predicate::Raw`] changes the SQL text. Named variants populate the named
/// parameter mapping; the base SQL is expected to already reference those names.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// A mapping of name to value.
    Named(NamedParams),
    /// A single named argument.
    Arg(NamedArg),
    /// A SQL condition plus positional values.
    Raw(Fragment),
}

impl From<Fragment> for Predicate {
    fn from(fragment: Fragment) -> Self {
        Predicate::Raw(fragment)
    }
}

impl From<&str> for Predicate {
    fn from(sql: &str) -> Self {
        Predicate::Raw(raw(sql))
    }
}

impl From<String> for Predicate {
    fn from(sql: String) -> Self {
        Predicate::Raw(raw(sql))
    }
}

impl From<NamedArg> for Predicate {
    fn from(arg: NamedArg) -> Self {
        Predicate::Arg(arg)
    }
}

impl<K, V> From<HashMap<K, V>> for Predicate
where
    K: Into<String>,
    V: ToSql + Sync + Send + 'static,
{
    fn from(map: HashMap<K, V>) -> Self {
        Predicate::Named(
            map.into_iter()
                .map(|(k, v)| (k.into(), Arc::new(v) as Param))
                .collect(),
        )
    }
}

impl<K, V> From<BTreeMap<K, V>> for Predicate
where
    K: Into<String>,
    V: ToSql + Sync + Send + 'static,
{
    fn from(map: BTreeMap<K, V>) -> Self {
        Predicate::Named(
            map.into_iter()
                .map(|(k, v)| (k.into(), Arc::new(v) as Param))
                .collect(),
        )
    }
}

/// One entry of a composed query's bound-value list.
#[derive(Debug, Clone)]
pub enum BoundValue {
    /// Matched to the next `?` placeholder.
    Positional(Param),
    /// The whole named mapping, matched to `@name` placeholders.
    Named(NamedParams),
}

impl BoundValue {
    pub fn is_named(&self) -> bool {
        matches!(self, BoundValue::Named(_))
    }
}
