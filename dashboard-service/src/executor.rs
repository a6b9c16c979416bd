//! Statement execution.
//!
//! Runs statements produced by the builder on a caller-owned connection.
//! Mutations run inside a transaction that commits on success; on any error
//! the transaction is dropped, which rolls it back.

use common::errors::{AppError, AppResult};
use common::utils::{SqlValue, Statement};
use sqlx::{Connection, Row};

use crate::connection_resolver::DbConnection;

/// Binds the statement parameters in placeholder order.
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut query = $query;
        for param in $params {
            query = match param {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::Float(v) => query.bind(*v),
                SqlValue::Text(v) => query.bind(v.clone()),
            };
        }
        query
    }};
}

/// Executes a mutation in its own transaction and returns the affected row count.
pub async fn execute(conn: &mut DbConnection, stmt: &Statement) -> AppResult<u64> {
    tracing::debug!(sql = %stmt.sql(), params = stmt.params().len(), "执行语句");

    let rows_affected = match conn {
        DbConnection::Postgres(c) => {
            let mut tx = c.begin().await.map_err(execution_error)?;
            let result = bind_params!(sqlx::query(stmt.sql()), stmt.params())
                .execute(&mut *tx)
                .await
                .map_err(execution_error)?;
            tx.commit().await.map_err(execution_error)?;
            result.rows_affected()
        }
        DbConnection::Sqlite(c) => {
            let mut tx = c.begin().await.map_err(execution_error)?;
            let result = bind_params!(sqlx::query(stmt.sql()), stmt.params())
                .execute(&mut *tx)
                .await
                .map_err(execution_error)?;
            tx.commit().await.map_err(execution_error)?;
            result.rows_affected()
        }
    };

    Ok(rows_affected)
}

/// Runs a query whose columns are all rendered as text and returns the rows
/// as JSON strings or nulls.
pub async fn fetch_text_rows(
    conn: &mut DbConnection,
    stmt: &Statement,
) -> AppResult<Vec<Vec<serde_json::Value>>> {
    tracing::debug!(sql = %stmt.sql(), "读取数据行");

    match conn {
        DbConnection::Postgres(c) => {
            let rows = bind_params!(sqlx::query(stmt.sql()), stmt.params())
                .fetch_all(&mut *c)
                .await
                .map_err(execution_error)?;
            rows.iter().map(|row| text_values(row, row.len())).collect()
        }
        DbConnection::Sqlite(c) => {
            let rows = bind_params!(sqlx::query(stmt.sql()), stmt.params())
                .fetch_all(&mut *c)
                .await
                .map_err(execution_error)?;
            rows.iter().map(|row| text_values(row, row.len())).collect()
        }
    }
}

fn text_values<R>(row: &R, width: usize) -> AppResult<Vec<serde_json::Value>>
where
    R: Row,
    for<'r> Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    usize: sqlx::ColumnIndex<R>,
{
    (0..width)
        .map(|i| {
            row.try_get::<Option<String>, _>(i)
                .map(|v| v.map(serde_json::Value::String).unwrap_or(serde_json::Value::Null))
                .map_err(execution_error)
        })
        .collect()
}

fn execution_error(e: sqlx::Error) -> AppError {
    AppError::ExecutionFailed(e.to_string())
}
