//! # pgquery
//!
//! Dynamic SQL composition and concurrent pagination for PostgreSQL.
//!
//! ## Features
//!
//! - **SQL explicit**: a query is declared once as raw SELECT text plus optional
//!   count / GROUP BY / HAVING / ORDER BY fragments
//! - **Incremental filters**: raw `?` fragments, `@name` arguments and named mappings
//! - **Pagination**: count and data queries run concurrently and fold into a
//!   serializable [`Pagination`] envelope
//! - **Pluggable handlers**: a [`Handler`] turns the composed query into records and
//!   may run follow-up queries (eager loading, JSON decoding, ...)
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use pgquery::{raw, QueryBuilder, QuerySpec, RowHandler};
//!
//! let users = QuerySpec::new("SELECT u.* FROM users u JOIN companies c ON c.id = u.company_id")
//!     .named("users")
//!     .order_by("u.id")
//!     .handler(RowHandler::<User>::new());
//!
//! let page = QueryBuilder::new(&users)
//!     .filter(raw("c.name = ?").bind("Test Company 1"))
//!     .limit(20)
//!     .page(2)
//!     .paginate(&client)
//!     .await?;
//!
//! println!("{} of {} pages", page.page, page.total_page);
//! ```

pub mod builder;
pub mod client;
pub mod composed;
pub mod config;
pub mod error;
pub mod fetched;
pub mod handler;
pub mod paginate;
pub mod param;
mod placeholder;
pub mod query_spec;
pub mod row;

pub use async_trait::async_trait;
pub use builder::{Assembled, QueryBuilder, offset_for};
pub use client::{Executor, GenericClient};
pub use composed::{ComposedQuery, RenderedQuery};
pub use config::{CountErrorPolicy, QueryConfig, SqlLogConfig};
pub use error::{QueryError, QueryResult};
pub use fetched::{Fetched, project_one};
pub use handler::{Handler, JsonHandler, RowHandler, decode_json};
pub use paginate::{PageMeta, Pagination};
pub use param::{BoundValue, Fragment, NamedArg, NamedParams, Param, Predicate, named, param, raw};
pub use query_spec::QuerySpec;
pub use row::{FromRow, RowExt};
