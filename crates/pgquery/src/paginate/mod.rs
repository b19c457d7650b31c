//! Concurrent count + data pagination.
//!
//! `paginate` derives a count query and a data query from one builder state, runs them
//! concurrently with `tokio::join!`, and folds the count into a [`Pagination`] envelope.

use crate::builder::{QueryBuilder, count_wrap, offset_for};
use crate::client::Executor;
use crate::config::CountErrorPolicy;
use crate::error::QueryResult;
use crate::handler::Handler;
use serde::Serialize;
use serde_json::Value;

/// A page of records plus its position in the full result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination<T> {
    pub has_next: bool,
    pub has_prev: bool,
    pub per_page: i64,
    pub next_page: i64,
    #[serde(rename = "current_page")]
    pub page: i64,
    pub prev_page: i64,
    pub offset: i64,
    pub records: Vec<T>,
    pub total_record: i64,
    pub total_page: i64,
    /// Free-form data attached by the caller.
    pub metadata: Option<Value>,
    /// The count query failed and `total_record` is a placeholder zero.
    #[serde(skip)]
    pub count_failed: bool,
}

impl<T> Pagination<T> {
    /// Assemble an envelope from computed page metadata.
    pub fn new(meta: PageMeta, records: Vec<T>) -> Self {
        Self {
            has_next: meta.has_next,
            has_prev: meta.has_prev,
            per_page: meta.per_page,
            next_page: meta.next_page,
            page: meta.page,
            prev_page: meta.prev_page,
            offset: meta.offset,
            records,
            total_record: meta.total_record,
            total_page: meta.total_page,
            metadata: None,
            count_failed: false,
        }
    }

    /// Attach caller metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Page numbers derived from a total count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub total_record: i64,
    pub total_page: i64,
    pub page: i64,
    pub prev_page: i64,
    pub next_page: i64,
    pub has_prev: bool,
    pub has_next: bool,
    pub per_page: i64,
    pub offset: i64,
}

impl PageMeta {
    /// Page math for `count` records, the 1-based `page` and page size `limit`.
    ///
    /// A `limit` of 0 means "everything on one page": `total_page` is 1 and `per_page` is
    /// `count`.
    pub fn compute(count: i64, page: i64, limit: i64) -> Self {
        let page = page.max(1);
        let (total_page, per_page) = if limit > 0 {
            (count / limit + i64::from(count % limit != 0), limit)
        } else {
            (1, count)
        };
        let has_next = total_page > page;
        let has_prev = page > 1;

        Self {
            total_record: count,
            total_page,
            page,
            prev_page: if has_prev { page - 1 } else { page },
            next_page: if has_next { page + 1 } else { page },
            has_prev,
            has_next,
            per_page,
            offset: offset_for(page, limit),
        }
    }
}

impl<T> QueryBuilder<'_, T> {
    /// Fetch one page with the `QuerySpec`'s handler.
    ///
    /// # Panics
    ///
    /// When the `QuerySpec` has no handler.
    pub async fn paginate(self, conn: &dyn Executor) -> QueryResult<Pagination<T>> {
        let handler = self.spec_handler();
        self.paginate_with(conn, handler).await
    }

    /// Fetch one page with a call-time handler.
    ///
    /// The count and data queries run concurrently. A data-path error fails the call; a
    /// count-path error follows the configured [`CountErrorPolicy`].
    pub async fn paginate_with(
        mut self,
        conn: &dyn Executor,
        handler: &dyn Handler<T>,
    ) -> QueryResult<Pagination<T>> {
        if self.page < 1 {
            self.page = 1;
        }

        let assembled = self.assemble();
        let data = self.compose(assembled.data_sql);
        let count = self.compose(count_wrap(&assembled.count_sql));

        let count_total = async {
            let rendered = count.render()?;
            count.log("count", &rendered);
            conn.fetch_count(&rendered.sql, &rendered.params_ref()).await
        };
        let (count_result, data_result) = tokio::join!(count_total, handler.handle(conn, &data));

        let records = data_result?.into_vec();
        let (total, count_failed) = match count_result {
            Ok(total) => (total, false),
            Err(err) => match self.config.count_errors {
                CountErrorPolicy::Propagate => return Err(err),
                CountErrorPolicy::Absorb => {
                    tracing::warn!(
                        target: "pgquery.paginate",
                        query = data.name().unwrap_or("-"),
                        error = %err,
                        "count query failed; reporting zero total"
                    );
                    (0, true)
                }
            },
        };

        let meta = PageMeta::compute(total, self.page, self.limit);
        let mut pagination = Pagination::new(meta, records);
        pagination.count_failed = count_failed;
        Ok(pagination)
    }
}
