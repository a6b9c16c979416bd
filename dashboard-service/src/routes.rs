//! 路由模块

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// 创建数据表浏览与行操作路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/databases", get(handlers::list_databases))
        .route("/api/databases/{key}/tables", get(handlers::list_tables))
        .route(
            "/api/databases/{key}/tables/{table}/columns",
            get(handlers::describe_table),
        )
        .route(
            "/api/databases/{key}/tables/{table}/rows",
            get(handlers::list_rows).post(handlers::insert_row),
        )
        .route(
            "/api/databases/{key}/tables/{table}/rows/{pk}",
            put(handlers::update_row).delete(handlers::delete_row),
        )
}
