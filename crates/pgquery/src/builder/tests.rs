use super::*;
use crate::param::{named, raw};
use std::collections::HashMap;

#[derive(Debug)]
struct User;

fn users() -> QuerySpec<User> {
    QuerySpec::new("SELECT u.* FROM users u JOIN companies c ON c.id = u.company_id")
        .named("users")
}

fn positional_len(values: &[BoundValue]) -> usize {
    values.iter().filter(|v| !v.is_named()).count()
}

#[test]
fn test_seeded_from_spec() {
    let spec = users().order_by("u.id").group_by("u.id").having("COUNT(*) > 0");
    let qb = QueryBuilder::new(&spec);
    assert_eq!(qb.sql(), spec.sql());
    assert!(!qb.has_where());
    assert_eq!(
        qb.assemble().data_sql,
        "SELECT u.* FROM users u JOIN companies c ON c.id = u.company_id \
         GROUP BY u.id HAVING COUNT(*) > 0 ORDER BY u.id"
    );
}

#[test]
fn test_first_predicate_where_then_and() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users");
    let qb = QueryBuilder::new(&spec)
        .filter(raw("status = ?").bind("active"))
        .filter("deleted_at IS NULL")
        .filter(raw("role_id = ?").bind(1_i64));
    assert_eq!(
        qb.assemble().data_sql,
        "SELECT * FROM users WHERE status = ? AND deleted_at IS NULL AND role_id = ?"
    );
    assert!(qb.has_where());
    assert_eq!(qb.values().len(), 2);
}

#[test]
fn test_named_predicates_leave_sql_alone() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users WHERE name = @name");
    let mut map = HashMap::new();
    map.insert("name", "Ada".to_string());
    let qb = QueryBuilder::new(&spec)
        .filter(map)
        .filter(named("company", "Test Company 1"));
    assert_eq!(qb.sql(), "SELECT * FROM users WHERE name = @name");
    assert!(!qb.has_where());

    // A named predicate before any raw one does not consume the WHERE.
    let qb = qb.filter("id > 0");
    assert_eq!(qb.sql(), "SELECT * FROM users WHERE name = @name WHERE id > 0");
}

#[test]
fn test_values_positional_then_named() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users");
    let qb = QueryBuilder::new(&spec)
        .bind_named("company", "Test Company 1")
        .filter(raw("a = ? OR b = ?").bind(1_i64).bind(2_i64))
        .filter(raw("c = ?").bind(3_i64));
    let values = qb.values();
    assert_eq!(values.len(), 4);
    assert_eq!(positional_len(&values), 3);
    assert!(values[3].is_named());
}

#[test]
fn test_no_named_entry_when_mapping_empty() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users");
    let qb = QueryBuilder::new(&spec).filter(raw("id = ?").bind(1_i64));
    let values = qb.values();
    assert_eq!(values.len(), 1);
    assert!(!values[0].is_named());
}

#[test]
fn test_later_named_assignment_overwrites() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users WHERE name = @name");
    let qb = QueryBuilder::new(&spec)
        .bind_named("name", "first")
        .filter(named("name", "second"));
    assert_eq!(qb.explain_sql(), "SELECT * FROM users WHERE name = 'second'");
}

#[test]
fn test_predicates_reach_explicit_count_sql() {
    let spec = QuerySpec::<User>::with_count_sql("SELECT u.* FROM users u", "SELECT 1 FROM users u");
    let out = QueryBuilder::new(&spec)
        .filter(raw("u.age > ?").bind(18_i32))
        .order_by("u.id")
        .limit(10)
        .page(2)
        .assemble();
    assert_eq!(
        out.data_sql,
        "SELECT u.* FROM users u WHERE u.age > ? ORDER BY u.id LIMIT 10 OFFSET 10"
    );
    assert_eq!(out.count_sql, "SELECT 1 FROM users u WHERE u.age > ?");
}

#[test]
fn test_derived_count_sql_carries_predicates() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users");
    let out = QueryBuilder::new(&spec)
        .filter("active")
        .order_by("id")
        .limit(5)
        .assemble();
    assert_eq!(out.count_sql, "SELECT * FROM users WHERE active");
    assert_eq!(out.data_sql, "SELECT * FROM users WHERE active ORDER BY id LIMIT 5");
}

#[test]
fn test_filter_with_applies_closure() {
    fn active(b: QueryBuilder<'_, User>) -> QueryBuilder<'_, User> {
        b.filter("u.deleted_at IS NULL")
    }

    let spec = users();
    let qb = QueryBuilder::new(&spec).filter_with(active).filter_with(|b| b.limit(3));
    assert_eq!(
        qb.assemble().data_sql,
        "SELECT u.* FROM users u JOIN companies c ON c.id = u.company_id \
         WHERE u.deleted_at IS NULL LIMIT 3"
    );
}

#[test]
fn test_where_raw_with_erased_params() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users");
    let qb = QueryBuilder::new(&spec).where_raw(
        "id BETWEEN ? AND ?",
        [crate::param::param(1_i64), crate::param::param(9_i64)],
    );
    assert_eq!(qb.explain_sql(), "SELECT * FROM users WHERE id BETWEEN 1 AND 9");
}

#[test]
fn test_order_by_all_joins_with_comma() {
    let spec = users().order_by("u.id");
    let qb = QueryBuilder::new(&spec).order_by_all(["u.name", "u.id DESC"]);
    assert!(qb.assemble().data_sql.ends_with(" ORDER BY u.name,u.id DESC"));

    let qb = QueryBuilder::new(&spec).order_by_all(Vec::<&str>::new());
    assert!(qb.assemble().data_sql.ends_with(" ORDER BY u.id"));
}

#[test]
fn test_json_wrap_uses_configured_alias() {
    let spec = QuerySpec::<User>::new("SELECT * FROM users")
        .wrap_json(true)
        .config(QueryConfig::new().with_json_alias("rec"));
    let sql = QueryBuilder::new(&spec).limit(1).assemble().data_sql;
    assert_eq!(
        sql,
        "WITH rec AS (\nSELECT * FROM users LIMIT 1\n)\n\
         SELECT to_jsonb(row_to_json(rec)) AS rec\nFROM rec"
    );

    let plain = QueryBuilder::new(&spec).wrap_json(false).assemble().data_sql;
    assert_eq!(plain, "SELECT * FROM users");
}

#[test]
fn test_explain_sql_inlines_values() {
    let spec = users();
    let sql = QueryBuilder::new(&spec)
        .filter(raw("c.name = ?").bind("Test Company 1"))
        .filter(raw("u.id > ?").bind(10_i64))
        .limit(20)
        .page(3)
        .explain_sql();
    assert_eq!(
        sql,
        "SELECT u.* FROM users u JOIN companies c ON c.id = u.company_id \
         WHERE c.name = 'Test Company 1' AND u.id > 10 LIMIT 20 OFFSET 40"
    );
}

#[test]
fn test_clone_forks_state() {
    let spec = users();
    let base = QueryBuilder::new(&spec).filter("u.active");
    let forked = base.clone().filter("u.admin");
    assert_eq!(base.sql(), format!("{} WHERE u.active", spec.sql()));
    assert_eq!(forked.sql(), format!("{} WHERE u.active AND u.admin", spec.sql()));
}

#[test]
fn test_spec_is_not_mutated() {
    let spec = users();
    let _ = QueryBuilder::new(&spec).filter("u.active").order_by("u.name").assemble();
    assert_eq!(
        QueryBuilder::new(&spec).assemble().data_sql,
        "SELECT u.* FROM users u JOIN companies c ON c.id = u.company_id"
    );
}
