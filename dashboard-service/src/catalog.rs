//! Catalog introspection.
//!
//! Table listing, column description and primary-key discovery. Every query
//! here is read-only and takes the table name as a bound parameter.

use common::errors::{AppError, AppResult};
use common::models::query::ColumnInfo;
use common::models::PrimaryKeyInfo;
use common::utils::{Assignment, Ident, SqlValue};
use sqlx::Row;

use crate::connection_resolver::DbConnection;

const PG_LIST_TABLES: &str = "SELECT table_name::text AS table_name
     FROM information_schema.tables
     WHERE table_schema = 'public'
     ORDER BY table_name";

const PG_DESCRIBE_COLUMNS: &str = "SELECT column_name::text AS column_name,
            udt_name::text AS data_type,
            (is_nullable = 'YES') AS nullable
     FROM information_schema.columns
     WHERE table_schema = 'public' AND table_name = $1
     ORDER BY ordinal_position";

// indkey[0] is the first column of the index; indnkeyatts counts key columns.
const PG_PRIMARY_KEY: &str = "SELECT a.attname::text AS column_name,
            t.typname::text AS data_type,
            i.indnkeyatts::int4 AS key_columns
     FROM pg_index i
     JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = i.indkey[0]
     JOIN pg_type t ON t.oid = a.atttypid
     WHERE i.indrelid = to_regclass(quote_ident('public') || '.' || quote_ident($1))
       AND i.indisprimary";

const SQLITE_LIST_TABLES: &str = "SELECT name
     FROM sqlite_master
     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
     ORDER BY name";

const SQLITE_DESCRIBE_COLUMNS: &str = "SELECT name, type AS data_type, \"notnull\" AS not_null
     FROM pragma_table_info(?1)
     ORDER BY cid";

const SQLITE_PRIMARY_KEY: &str = "SELECT name, type AS data_type
     FROM pragma_table_info(?1)
     WHERE pk > 0
     ORDER BY pk";

/// Primary key of a table, as discovered from the catalog.
///
/// There is no public constructor: update and delete can only target rows
/// through a key returned by [`discover_primary_key`].
#[derive(Debug, Clone)]
pub struct PrimaryKey {
    column: Ident,
    data_type: Option<Ident>,
    key_columns: usize,
}

impl PrimaryKey {
    /// First column of the key.
    pub fn column(&self) -> &Ident {
        &self.column
    }

    /// Number of columns in the key.
    pub fn key_columns(&self) -> usize {
        self.key_columns
    }

    /// Whether the key spans more than one column.
    pub fn is_composite(&self) -> bool {
        self.key_columns > 1
    }

    /// Builds the `"pk" = value` match for a caller-supplied key value.
    ///
    /// A key column without a declared type (SQLite, no affinity) compares
    /// text and integers as distinct values, so integer-looking keys are
    /// matched as integers there.
    pub fn matching(&self, value: SqlValue) -> Assignment {
        let value = match (&self.data_type, value) {
            (None, SqlValue::Text(text)) => match text.parse::<i64>() {
                Ok(i) => SqlValue::Int(i),
                Err(_) => SqlValue::Text(text),
            },
            (_, value) => value,
        };
        Assignment::new(self.column.clone(), value).with_cast(self.data_type.clone())
    }

    /// Converts to the API model.
    pub fn info(&self) -> PrimaryKeyInfo {
        PrimaryKeyInfo {
            column: self.column.to_string(),
            data_type: self.data_type.as_ref().map(ToString::to_string),
            key_columns: self.key_columns,
        }
    }
}

/// Lists the user tables of the database.
pub async fn list_tables(conn: &mut DbConnection) -> AppResult<Vec<String>> {
    let rows = match conn {
        DbConnection::Postgres(c) => sqlx::query(PG_LIST_TABLES)
            .fetch_all(&mut *c)
            .await
            .map_err(catalog_error)?
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>(),
        DbConnection::Sqlite(c) => sqlx::query(SQLITE_LIST_TABLES)
            .fetch_all(&mut *c)
            .await
            .map_err(catalog_error)?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<Vec<_>, _>>(),
    };
    rows.map_err(catalog_error)
}

/// Describes the columns of `table` in ordinal order.
///
/// Returns an empty list when the table does not exist.
pub async fn describe_columns(conn: &mut DbConnection, table: &Ident) -> AppResult<Vec<ColumnInfo>> {
    match conn {
        DbConnection::Postgres(c) => {
            let rows = sqlx::query(PG_DESCRIBE_COLUMNS)
                .bind(table.as_str())
                .fetch_all(&mut *c)
                .await
                .map_err(catalog_error)?;
            rows.iter()
                .map(|row| {
                    Ok(ColumnInfo {
                        name: row.try_get("column_name")?,
                        data_type: row.try_get("data_type")?,
                        nullable: row.try_get("nullable")?,
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(catalog_error)
        }
        DbConnection::Sqlite(c) => {
            let rows = sqlx::query(SQLITE_DESCRIBE_COLUMNS)
                .bind(table.as_str())
                .fetch_all(&mut *c)
                .await
                .map_err(catalog_error)?;
            rows.iter()
                .map(|row| {
                    let not_null: i64 = row.try_get("not_null")?;
                    Ok(ColumnInfo {
                        name: row.try_get("name")?,
                        data_type: row.try_get("data_type")?,
                        nullable: Some(not_null == 0),
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
                .map_err(catalog_error)
        }
    }
}

/// Discovers the primary key of `table`.
///
/// Only the first column of a composite key is used to target rows.
///
/// # Errors
/// `PrimaryKeyNotFound` when the table does not exist or has no primary key.
pub async fn discover_primary_key(conn: &mut DbConnection, table: &Ident) -> AppResult<PrimaryKey> {
    let (column, data_type, key_columns) = match conn {
        DbConnection::Postgres(c) => {
            let row = sqlx::query(PG_PRIMARY_KEY)
                .bind(table.as_str())
                .fetch_optional(&mut *c)
                .await
                .map_err(catalog_error)?
                .ok_or_else(|| AppError::PrimaryKeyNotFound(table.to_string()))?;
            let column: String = row.try_get("column_name").map_err(catalog_error)?;
            let data_type: String = row.try_get("data_type").map_err(catalog_error)?;
            let key_columns: i32 = row.try_get("key_columns").map_err(catalog_error)?;
            (column, data_type, usize::try_from(key_columns).unwrap_or(1))
        }
        DbConnection::Sqlite(c) => {
            let rows = sqlx::query(SQLITE_PRIMARY_KEY)
                .bind(table.as_str())
                .fetch_all(&mut *c)
                .await
                .map_err(catalog_error)?;
            let first = rows
                .first()
                .ok_or_else(|| AppError::PrimaryKeyNotFound(table.to_string()))?;
            let column: String = first.try_get("name").map_err(catalog_error)?;
            let data_type: String = first.try_get("data_type").map_err(catalog_error)?;
            (column, data_type, rows.len())
        }
    };

    let key = PrimaryKey {
        column: Ident::new(column)?,
        data_type: Ident::new(data_type).ok(),
        key_columns,
    };
    if key.is_composite() {
        tracing::warn!(
            table = %table,
            column = %key.column,
            key_columns = key.key_columns,
            "复合主键仅使用第一列定位行"
        );
    }
    Ok(key)
}

fn catalog_error(e: sqlx::Error) -> AppError {
    AppError::ExecutionFailed(format!("catalog query failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, pg_table, postgres_db, run};

    fn ident(name: &str) -> Ident {
        Ident::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_single_column_key() {
        let mut conn =
            memory_db(&["CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)"]).await;
        let pk = discover_primary_key(&mut conn, &ident("users")).await.unwrap();
        assert_eq!(pk.column().as_str(), "id");
        assert_eq!(pk.key_columns(), 1);
        assert!(!pk.is_composite());
        conn.close().await;
    }

    #[tokio::test]
    async fn test_key_need_not_be_first_column() {
        let mut conn = memory_db(&[
            "CREATE TABLE accounts (label TEXT, code TEXT PRIMARY KEY, balance REAL)",
        ])
        .await;
        let pk = discover_primary_key(&mut conn, &ident("accounts")).await.unwrap();
        assert_eq!(pk.column().as_str(), "code");
        assert_eq!(pk.info().data_type.as_deref(), Some("TEXT"));
        conn.close().await;
    }

    #[tokio::test]
    async fn test_composite_key_returns_first_key_column() {
        let mut conn = memory_db(&[
            "CREATE TABLE memberships (member TEXT, team_id INTEGER, grp TEXT, PRIMARY KEY (team_id, member))",
        ])
        .await;
        let pk = discover_primary_key(&mut conn, &ident("memberships")).await.unwrap();
        assert_eq!(pk.column().as_str(), "team_id");
        assert_eq!(pk.key_columns(), 2);
        assert!(pk.is_composite());
        conn.close().await;
    }

    #[tokio::test]
    async fn test_no_key_or_missing_table_is_not_found() {
        let mut conn = memory_db(&["CREATE TABLE audit_log (at TEXT, message TEXT)"]).await;
        for table in ["audit_log", "does_not_exist"] {
            let err = discover_primary_key(&mut conn, &ident(table)).await.unwrap_err();
            assert!(matches!(err, AppError::PrimaryKeyNotFound(t) if t == table));
        }
        conn.close().await;
    }

    #[tokio::test]
    async fn test_table_name_is_not_interpolated() {
        let mut conn = memory_db(&["CREATE TABLE users (id INTEGER PRIMARY KEY)"]).await;
        let hostile = ident("users') UNION SELECT 'x', 'y', 1 --");
        assert!(discover_primary_key(&mut conn, &hostile).await.is_err());
        assert_eq!(list_tables(&mut conn).await.unwrap(), ["users"]);
        conn.close().await;
    }

    #[tokio::test]
    async fn test_untyped_key_matches_integer_text() {
        let mut conn = memory_db(&["CREATE TABLE loose (id PRIMARY KEY, note)"]).await;
        let pk = discover_primary_key(&mut conn, &ident("loose")).await.unwrap();
        assert_eq!(pk.info().data_type, None);
        assert_eq!(pk.matching(SqlValue::from("1")).value, SqlValue::Int(1));
        assert_eq!(pk.matching(SqlValue::from("a-1")).value, SqlValue::from("a-1"));
        conn.close().await;
    }

    #[tokio::test]
    async fn test_typed_key_keeps_text() {
        let mut conn = memory_db(&["CREATE TABLE codes (code TEXT PRIMARY KEY)"]).await;
        let pk = discover_primary_key(&mut conn, &ident("codes")).await.unwrap();
        assert_eq!(pk.matching(SqlValue::from("007")).value, SqlValue::from("007"));
        conn.close().await;
    }

    #[tokio::test]
    async fn test_listing_hides_only_internal_tables() {
        let mut conn = memory_db(&[
            "CREATE TABLE sqlite1log (id INTEGER PRIMARY KEY)",
            "CREATE TABLE counters (id INTEGER PRIMARY KEY AUTOINCREMENT)",
        ])
        .await;
        // AUTOINCREMENT creates the internal sqlite_sequence table.
        assert_eq!(list_tables(&mut conn).await.unwrap(), ["counters", "sqlite1log"]);
        conn.close().await;
    }

    #[tokio::test]
    async fn test_list_and_describe() {
        let mut conn = memory_db(&[
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, bio TEXT)",
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER)",
        ])
        .await;
        assert_eq!(list_tables(&mut conn).await.unwrap(), ["orders", "users"]);

        let columns = describe_columns(&mut conn, &ident("users")).await.unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "bio"]);
        assert_eq!(columns[1].data_type, "TEXT");
        assert_eq!(columns[1].nullable, Some(false));
        assert_eq!(columns[2].nullable, Some(true));

        assert!(describe_columns(&mut conn, &ident("ghost")).await.unwrap().is_empty());
        conn.close().await;
    }

    #[tokio::test]
    async fn test_postgres_catalog() {
        let Some(mut conn) = postgres_db().await else {
            return;
        };
        let single = pg_table("pk_single");
        let composite = pg_table("pk_composite");
        let keyless = pg_table("pk_none");
        for table in [&single, &composite, &keyless] {
            run(&mut conn, &format!("DROP TABLE IF EXISTS \"{table}\"")).await;
        }
        run(
            &mut conn,
            &format!("CREATE TABLE \"{single}\" (label text, \"Code\" uuid PRIMARY KEY)"),
        )
        .await;
        run(
            &mut conn,
            &format!(
                "CREATE TABLE \"{composite}\" (member text, team_id int4, PRIMARY KEY (team_id, member))"
            ),
        )
        .await;
        run(&mut conn, &format!("CREATE TABLE \"{keyless}\" (at text, message text)")).await;

        let pk = discover_primary_key(&mut conn, &ident(&single)).await.unwrap();
        assert_eq!(pk.column().as_str(), "Code");
        assert_eq!(pk.info().data_type.as_deref(), Some("uuid"));
        assert!(!pk.is_composite());

        let pk = discover_primary_key(&mut conn, &ident(&composite)).await.unwrap();
        assert_eq!(pk.column().as_str(), "team_id");
        assert_eq!(pk.key_columns(), 2);

        let err = discover_primary_key(&mut conn, &ident(&keyless)).await.unwrap_err();
        assert!(matches!(err, AppError::PrimaryKeyNotFound(_)));
        let err = discover_primary_key(&mut conn, &ident(&pg_table("pk_missing"))).await.unwrap_err();
        assert!(matches!(err, AppError::PrimaryKeyNotFound(_)));

        let tables = list_tables(&mut conn).await.unwrap();
        assert!(tables.contains(&single) && tables.contains(&keyless));

        let columns = describe_columns(&mut conn, &ident(&single)).await.unwrap();
        assert_eq!(
            columns,
            vec![
                ColumnInfo {
                    name: "label".into(),
                    data_type: "text".into(),
                    nullable: Some(true)
                },
                ColumnInfo {
                    name: "Code".into(),
                    data_type: "uuid".into(),
                    nullable: Some(false)
                },
            ]
        );

        for table in [&single, &composite, &keyless] {
            run(&mut conn, &format!("DROP TABLE \"{table}\"")).await;
        }
        conn.close().await;
    }
}
