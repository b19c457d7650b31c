//! End-to-end checks against a live PostgreSQL.
//!
//! Set `DATABASE_URL` (environment or `.env`) to run; the test is skipped otherwise.
//! Everything happens in temp tables inside a transaction that is rolled back.

use chrono::{DateTime, Utc};
use pgquery::{
    ComposedQuery, Executor, Fetched, FromRow, GenericClient, Handler, JsonHandler, QueryBuilder,
    QueryError, QueryResult, QuerySpec, RowExt, RowHandler, async_trait, named, raw,
};
use serde::Deserialize;
use tokio_postgres::{NoTls, Row};

#[derive(Debug, Clone)]
struct User {
    id: i64,
    name: String,
    company_id: i64,
    created_at: DateTime<Utc>,
    devices: Vec<Device>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            name: row.try_get_column("name")?,
            company_id: row.try_get_column("company_id")?,
            created_at: row.try_get_column("created_at")?,
            devices: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Device {
    id: i64,
    user_id: i64,
    token: String,
}

impl FromRow for Device {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            user_id: row.try_get_column("user_id")?,
            token: row.try_get_column("token")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserJson {
    id: i64,
    name: String,
    company_id: i64,
}

/// Loads users, then their devices with one follow-up query.
struct UsersWithDevices;

#[async_trait]
impl Handler<User> for UsersWithDevices {
    async fn handle(&self, conn: &dyn Executor, query: &ComposedQuery) -> QueryResult<Fetched<User>> {
        let mut users: Vec<User> = query.fetch_all_as(conn).await?;
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        let rows = conn
            .fetch_rows(
                "SELECT id, user_id, token FROM devices WHERE user_id = ANY($1) ORDER BY id",
                &[&ids],
            )
            .await?;
        for row in &rows {
            let device = Device::from_row(row)?;
            if let Some(user) = users.iter_mut().find(|u| u.id == device.user_id) {
                user.devices.push(device);
            }
        }
        Ok(Fetched::Many(users))
    }
}

const USERS_SQL: &str = "SELECT u.* FROM users u JOIN companies c ON c.id = u.company_id";

async fn seed(conn: &impl GenericClient) -> QueryResult<()> {
    conn.execute(
        "CREATE TEMP TABLE companies (id BIGINT PRIMARY KEY, name TEXT NOT NULL)",
        &[],
    )
    .await?;
    conn.execute(
        "CREATE TEMP TABLE users (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            company_id BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        &[],
    )
    .await?;
    conn.execute(
        "CREATE TEMP TABLE devices (id BIGINT PRIMARY KEY, user_id BIGINT NOT NULL, token TEXT NOT NULL)",
        &[],
    )
    .await?;
    conn.execute(
        "INSERT INTO companies VALUES (1, 'Test Company 1'), (2, 'Test Company 2')",
        &[],
    )
    .await?;
    conn.execute(
        "INSERT INTO users (id, name, company_id)
         SELECT i, 'user_' || i, CASE WHEN i <= 12 THEN 1 ELSE 2 END FROM generate_series(1, 15) i",
        &[],
    )
    .await?;
    conn.execute(
        "INSERT INTO devices SELECT i, i, 'token_' || i FROM generate_series(1, 15) i",
        &[],
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn compose_and_paginate_against_postgres() -> QueryResult<()> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping compose_and_paginate_against_postgres");
            return Ok(());
        }
    };

    let (mut client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .map_err(QueryError::from_db_error)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });

    let tx = client.transaction().await.map_err(QueryError::from_db_error)?;
    seed(&tx).await?;

    let users = QuerySpec::new(USERS_SQL)
        .named("users")
        .order_by("u.id")
        .handler(UsersWithDevices);

    // Middle page with a positional filter.
    let page = QueryBuilder::new(&users)
        .filter(raw("c.name = ?").bind("Test Company 1"))
        .limit(5)
        .page(2)
        .paginate(&tx)
        .await?;
    assert_eq!(page.total_record, 12);
    assert_eq!(page.total_page, 3);
    assert_eq!(page.offset, 5);
    assert!(page.has_next && page.has_prev);
    assert!(!page.count_failed);
    let ids: Vec<i64> = page.records.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![6, 7, 8, 9, 10]);
    assert!(page.records.iter().all(|u| u.devices.len() == 1));
    assert!(page.records.iter().all(|u| u.company_id == 1));
    assert!(page.records[0].created_at <= Utc::now());

    // Named arguments mixed with positional values.
    let one = QueryBuilder::new(&users)
        .filter(raw("c.name = @company AND u.id > ?").bind(10_i64))
        .filter(named("company", "Test Company 1"))
        .fetch_one(&tx)
        .await?;
    assert_eq!(one.id, 11);
    assert_eq!(one.name, "user_11");
    assert_eq!(one.devices[0].token, "token_11");

    // Nothing matches.
    let err = QueryBuilder::new(&users)
        .filter(raw("u.id > ?").bind(1000_i64))
        .fetch_one(&tx)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Plain row mapping, no follow-up query.
    let plain = QuerySpec::new(USERS_SQL).handler(RowHandler::<User>::new());
    let all = QueryBuilder::new(&plain)
        .filter(raw("c.id = ?").bind(2_i64))
        .order_by("u.id DESC")
        .fetch_many(&tx)
        .await?;
    assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![15, 14, 13]);

    // JSON wrap mode.
    let json = QuerySpec::new(USERS_SQL)
        .wrap_json(true)
        .order_by("u.id")
        .handler(JsonHandler::<UserJson>::new());
    let page = QueryBuilder::new(&json).limit(4).page(1).paginate(&tx).await?;
    assert_eq!(page.total_record, 15);
    assert_eq!(page.records.len(), 4);
    assert_eq!(page.records[0].id, 1);
    assert_eq!(page.records[0].name, "user_1");
    assert_eq!(page.records[0].company_id, 1);

    // Raw scans.
    let total: i64 = QueryBuilder::new(&QuerySpec::<()>::new("SELECT COUNT(*) FROM users"))
        .fetch_scalar::<i64>(&tx)
        .await?;
    assert_eq!(total, 15);
    let device: Device = QueryBuilder::new(&QuerySpec::<()>::new("SELECT * FROM devices"))
        .filter(raw("token = ?").bind("token_3"))
        .scan_one::<Device>(&tx)
        .await?;
    assert_eq!(device.id, 3);
    assert_eq!(device.user_id, 3);

    tx.rollback().await.map_err(QueryError::from_db_error)?;
    Ok(())
}
