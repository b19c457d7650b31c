//! Clause assembly: builder state in, final data and count SQL out.

/// Final SQL texts for one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    /// The data query, with every clause and the optional JSON wrap applied.
    pub data_sql: String,
    /// The count base: GROUP BY / HAVING only. Not yet wrapped in `COUNT`.
    pub count_sql: String,
}

/// Borrowed view of the clause state to assemble.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Clauses<'a> {
    pub sql: &'a str,
    pub count_sql: &'a str,
    pub group_by: &'a str,
    pub having: &'a str,
    pub order_by: &'a str,
    pub limit: i64,
    pub page: i64,
    pub wrap_json: Option<&'a str>,
}

/// Zero-based row offset of `page`. Only pages after the first with a positive limit skip rows.
///
/// Saturates at `i64::MAX` instead of overflowing.
pub fn offset_for(page: i64, limit: i64) -> i64 {
    if page > 1 && limit > 0 {
        (page - 1).saturating_mul(limit)
    } else {
        0
    }
}

pub(crate) fn assemble(c: Clauses<'_>) -> Assembled {
    let mut data_sql = c.sql.to_string();
    let mut count_sql = if c.count_sql.is_empty() {
        c.sql.to_string()
    } else {
        c.count_sql.to_string()
    };

    if !c.group_by.is_empty() {
        for sql in [&mut data_sql, &mut count_sql] {
            sql.push_str(" GROUP BY ");
            sql.push_str(c.group_by);
        }
    }

    if !c.having.is_empty() {
        for sql in [&mut data_sql, &mut count_sql] {
            sql.push_str(" HAVING ");
            sql.push_str(c.having);
        }
    }

    if !c.order_by.is_empty() {
        data_sql.push_str(" ORDER BY ");
        data_sql.push_str(c.order_by);
    }

    if c.limit > 0 {
        data_sql.push_str(&format!(" LIMIT {}", c.limit));
    }

    if c.page > 0 {
        data_sql.push_str(&format!(" OFFSET {}", offset_for(c.page, c.limit)));
    }

    if let Some(alias) = c.wrap_json {
        data_sql = wrap_json(&data_sql, alias);
    }

    Assembled {
        data_sql,
        count_sql,
    }
}

/// One `jsonb` column per record, named `alias`.
fn wrap_json(sql: &str, alias: &str) -> String {
    format!(
        "WITH {alias} AS (\n{sql}\n)\nSELECT to_jsonb(row_to_json({alias})) AS {alias}\nFROM {alias}"
    )
}

/// Wrap a count base so it yields a single row count.
pub(crate) fn count_wrap(count_sql: &str) -> String {
    format!("SELECT COUNT(1) FROM (\n{count_sql}\n) t")
}
