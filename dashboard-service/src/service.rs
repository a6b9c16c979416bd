//! 数据表服务模块
//!
//! 每个操作独占一个连接：解析连接 → 执行 → 关闭连接，无论成功或失败都只关闭一次。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{
    ColumnValue, DatabaseItem, MutationKind, MutationResult, TableDescription, TableList, TableRows,
};
use common::utils::{Assignment, Dialect, Ident, SqlValue, Statement};

use crate::catalog;
use crate::connection_resolver::{ConnectionResolver, DbConnection};
use crate::executor;

/// 数据表服务 Trait
#[async_trait]
pub trait TableServiceTrait: Send + Sync {
    /// 列出已配置的数据库
    fn databases(&self) -> Vec<DatabaseItem>;

    /// 列出数据库中的表
    async fn list_tables(&self, key: &str) -> AppResult<TableList>;

    /// 查看表结构与主键
    async fn describe_table(&self, key: &str, table: &str) -> AppResult<TableDescription>;

    /// 读取表中的数据行
    async fn list_rows(&self, key: &str, table: &str, limit: Option<u32>) -> AppResult<TableRows>;

    /// 插入一行
    async fn insert_row(
        &self,
        key: &str,
        table: &str,
        columns: &[ColumnValue],
    ) -> AppResult<MutationResult>;

    /// 按主键更新一行
    async fn update_row(
        &self,
        key: &str,
        table: &str,
        pk_value: &str,
        columns: &[ColumnValue],
    ) -> AppResult<MutationResult>;

    /// 按主键删除一行
    async fn delete_row(&self, key: &str, table: &str, pk_value: &str) -> AppResult<MutationResult>;
}

/// 数据表浏览与行级增删改服务
pub struct TableService {
    config: Arc<AppConfig>,
    resolver: Arc<ConnectionResolver>,
}

impl TableService {
    /// 创建新的数据表服务实例
    pub fn new(config: Arc<AppConfig>, resolver: Arc<ConnectionResolver>) -> Self {
        Self { config, resolver }
    }
}

#[async_trait]
impl TableServiceTrait for TableService {
    fn databases(&self) -> Vec<DatabaseItem> {
        self.resolver.describe_databases()
    }

    async fn list_tables(&self, key: &str) -> AppResult<TableList> {
        let mut conn = self.resolver.resolve(key).await?;
        let result = catalog::list_tables(&mut conn).await;
        conn.close().await;

        let tables = result?;
        tracing::info!(database = %key, count = tables.len(), "已获取表列表");
        Ok(TableList {
            database: key.to_string(),
            mode: self.resolver.mode(),
            tables,
        })
    }

    async fn describe_table(&self, key: &str, table: &str) -> AppResult<TableDescription> {
        let mut conn = self.resolver.resolve(key).await?;
        let result = describe_on(&mut conn, table).await;
        conn.close().await;
        result
    }

    async fn list_rows(&self, key: &str, table: &str, limit: Option<u32>) -> AppResult<TableRows> {
        let limit = self.config.effective_row_limit(limit);
        let mut conn = self.resolver.resolve(key).await?;
        let result = list_rows_on(&mut conn, table, limit).await;
        conn.close().await;
        result
    }

    async fn insert_row(
        &self,
        key: &str,
        table: &str,
        columns: &[ColumnValue],
    ) -> AppResult<MutationResult> {
        let mut conn = self.resolver.resolve(key).await?;
        let result = insert_on(&mut conn, table, columns).await;
        conn.close().await;
        log_mutation(key, &result);
        result
    }

    async fn update_row(
        &self,
        key: &str,
        table: &str,
        pk_value: &str,
        columns: &[ColumnValue],
    ) -> AppResult<MutationResult> {
        let mut conn = self.resolver.resolve(key).await?;
        let result = update_on(&mut conn, table, pk_value, columns).await;
        conn.close().await;
        log_mutation(key, &result);
        result
    }

    async fn delete_row(&self, key: &str, table: &str, pk_value: &str) -> AppResult<MutationResult> {
        let mut conn = self.resolver.resolve(key).await?;
        let result = delete_on(&mut conn, table, pk_value).await;
        conn.close().await;
        log_mutation(key, &result);
        result
    }
}

fn log_mutation(key: &str, result: &AppResult<MutationResult>) {
    match result {
        Ok(r) if r.row_found => {
            tracing::info!(database = %key, table = %r.table, operation = %r.operation, rows = r.rows_affected, "行操作已提交")
        }
        Ok(r) => {
            tracing::info!(database = %key, table = %r.table, operation = %r.operation, "未找到匹配的行")
        }
        Err(e) => tracing::warn!(database = %key, error = %e, "行操作失败"),
    }
}

/// Fails with `TableNotFound` unless `table` appears in the catalog listing.
async fn ensure_listed(conn: &mut DbConnection, table: &str) -> AppResult<Ident> {
    let tables = catalog::list_tables(conn).await?;
    if !tables.iter().any(|t| t == table) {
        return Err(AppError::TableNotFound(table.to_string()));
    }
    Ident::new(table)
}

async fn describe_on(conn: &mut DbConnection, table: &str) -> AppResult<TableDescription> {
    let table_ident = ensure_listed(conn, table).await?;
    let columns = catalog::describe_columns(conn, &table_ident).await?;
    let primary_key = match catalog::discover_primary_key(conn, &table_ident).await {
        Ok(pk) => Some(pk.info()),
        Err(AppError::PrimaryKeyNotFound(_)) => None,
        Err(e) => return Err(e),
    };
    Ok(TableDescription {
        table: table.to_string(),
        columns,
        primary_key,
    })
}

async fn list_rows_on(conn: &mut DbConnection, table: &str, limit: u32) -> AppResult<TableRows> {
    let table_ident = ensure_listed(conn, table).await?;
    let columns = catalog::describe_columns(conn, &table_ident).await?;
    let idents = columns
        .iter()
        .map(|c| Ident::new(c.name.as_str()))
        .collect::<AppResult<Vec<_>>>()?;

    let stmt = Statement::select_rows(conn.dialect(), &table_ident, &idents, limit)?;
    let rows = executor::fetch_text_rows(conn, &stmt).await?;
    Ok(TableRows::new(table, columns, rows))
}

/// Pairs caller values with their columns, casting to the catalog type on Postgres.
async fn typed_assignments(
    conn: &mut DbConnection,
    table: &Ident,
    columns: &[ColumnValue],
) -> AppResult<Vec<Assignment>> {
    let assignments = Assignment::from_column_values(columns)?;
    if conn.dialect() != Dialect::Postgres {
        return Ok(assignments);
    }

    let types: HashMap<String, String> = catalog::describe_columns(conn, table)
        .await?
        .into_iter()
        .map(|c| (c.name, c.data_type))
        .collect();

    Ok(assignments
        .into_iter()
        .map(|a| {
            let cast = types.get(a.column.as_str()).and_then(|t| Ident::new(t.as_str()).ok());
            a.with_cast(cast)
        })
        .collect())
}

async fn insert_on(
    conn: &mut DbConnection,
    table: &str,
    columns: &[ColumnValue],
) -> AppResult<MutationResult> {
    let table_ident = Ident::new(table)?;
    let assignments = typed_assignments(conn, &table_ident, columns).await?;
    let stmt = Statement::insert(conn.dialect(), &table_ident, &assignments)?;
    let affected = executor::execute(conn, &stmt).await?;
    Ok(MutationResult::new(MutationKind::Insert, table, affected))
}

async fn update_on(
    conn: &mut DbConnection,
    table: &str,
    pk_value: &str,
    columns: &[ColumnValue],
) -> AppResult<MutationResult> {
    let table_ident = Ident::new(table)?;
    let pk = catalog::discover_primary_key(conn, &table_ident).await?;
    let assignments = typed_assignments(conn, &table_ident, columns).await?;
    let key = pk.matching(SqlValue::from(pk_value));
    let stmt = Statement::update(conn.dialect(), &table_ident, &key, &assignments)?;
    let affected = executor::execute(conn, &stmt).await?;
    Ok(MutationResult::new(MutationKind::Update, table, affected))
}

async fn delete_on(conn: &mut DbConnection, table: &str, pk_value: &str) -> AppResult<MutationResult> {
    let table_ident = Ident::new(table)?;
    let pk = catalog::discover_primary_key(conn, &table_ident).await?;
    let stmt = Statement::delete(conn.dialect(), &table_ident, &pk.matching(SqlValue::from(pk_value)))?;
    let affected = executor::execute(conn, &stmt).await?;
    Ok(MutationResult::new(MutationKind::Delete, table, affected))
}
