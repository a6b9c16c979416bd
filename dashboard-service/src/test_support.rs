//! Fixtures shared by the unit tests.

use sqlx::{Connection, SqliteConnection};

use crate::connection_resolver::DbConnection;

/// Opens an in-memory SQLite database and runs `ddl` on it.
pub async fn memory_db(ddl: &[&str]) -> DbConnection {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
    seed(&mut conn, ddl).await;
    DbConnection::Sqlite(conn)
}

/// Creates a file-backed SQLite database in `dir`, runs `ddl` on it and
/// returns its URL. Data survives across the per-request connections.
pub async fn file_db(dir: &tempfile::TempDir, ddl: &[&str]) -> String {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("dashboard.db").display());
    let mut conn = SqliteConnection::connect(&url).await.unwrap();
    seed(&mut conn, ddl).await;
    conn.close().await.unwrap();
    url
}

async fn seed(conn: &mut SqliteConnection, ddl: &[&str]) {
    for stmt in ddl {
        sqlx::query(stmt).execute(&mut *conn).await.unwrap();
    }
}

/// Opens a Postgres connection when `DATABASE_URL` points at one.
///
/// Postgres tests return early without it, so the suite stays runnable on
/// machines without a server.
pub async fn postgres_db() -> Option<DbConnection> {
    let url = std::env::var("DATABASE_URL").ok()?;
    if !url.starts_with("postgres") {
        return None;
    }
    let conn = sqlx::PgConnection::connect(&url).await.unwrap();
    Some(DbConnection::Postgres(conn))
}

/// Table name unique to this test process, so concurrent runs against the
/// same server do not collide.
pub fn pg_table(name: &str) -> String {
    format!("{}_{}", name, std::process::id())
}

/// Runs raw SQL on a test connection.
pub async fn run(conn: &mut DbConnection, sql: &str) {
    let result = match conn {
        DbConnection::Postgres(c) => sqlx::query(sql).execute(&mut *c).await.map(|_| ()),
        DbConnection::Sqlite(c) => sqlx::query(sql).execute(&mut *c).await.map(|_| ()),
    };
    result.unwrap();
}
