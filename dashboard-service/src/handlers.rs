//! Handler模块

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::config::DeploymentMode;
use common::errors::{AppError, RequestError};
use common::middleware::RequestId;
use common::models::{
    DatabaseItem, ListRowsQuery, MutationResult, RowValuesRequest, TableDescription, TableList,
    TableRows,
};
use common::response::ApiResponse;

use crate::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, RequestError>;

/// 单个请求的响应上下文，成功与失败的响应都带上请求 ID 与服务名
struct RequestScope<'a> {
    state: &'a AppState,
    request_id: &'a RequestId,
}

impl<'a> RequestScope<'a> {
    fn new(state: &'a AppState, request_id: &'a RequestId) -> Self {
        Self { state, request_id }
    }

    fn reply<T: Serialize>(&self, data: T) -> Json<ApiResponse<T>> {
        Json(
            ApiResponse::ok_with_service(data, self.state.config.service_name.as_str())
                .with_request_id(self.request_id.as_str()),
        )
    }

    fn fail(&self, error: impl Into<AppError>) -> RequestError {
        error
            .into()
            .for_request(self.request_id.as_str(), self.state.config.service_name.as_str())
    }

    /// 请求体解析失败也按统一格式返回
    fn body<T>(&self, payload: Result<Json<T>, JsonRejection>) -> Result<T, RequestError> {
        payload
            .map(|Json(body)| body)
            .map_err(|e| self.fail(AppError::Validation(e.body_text())))
    }
}

/// 列出已配置的数据库
#[utoipa::path(
    get,
    path = "/api/databases",
    tag = "databases",
    responses(
        (status = 200, description = "数据库列表", body = ApiResponse<Vec<DatabaseItem>>)
    )
)]
pub async fn list_databases(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> ApiResult<Vec<DatabaseItem>> {
    let scope = RequestScope::new(&state, &request_id);
    Ok(scope.reply(state.service.databases()))
}

/// 列出数据库中的表
#[utoipa::path(
    get,
    path = "/api/databases/{key}/tables",
    tag = "tables",
    params(
        ("key" = String, Path, description = "数据库键")
    ),
    responses(
        (status = 200, description = "表列表", body = ApiResponse<TableList>),
        (status = 404, description = "数据库未注册"),
        (status = 502, description = "数据库连接失败"),
        (status = 503, description = "当前模式缺少连接配置")
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(key): Path<String>,
) -> ApiResult<TableList> {
    let scope = RequestScope::new(&state, &request_id);
    let data = state.service.list_tables(&key).await.map_err(|e| scope.fail(e))?;
    Ok(scope.reply(data))
}

/// 查看表结构与主键
#[utoipa::path(
    get,
    path = "/api/databases/{key}/tables/{table}/columns",
    tag = "tables",
    params(
        ("key" = String, Path, description = "数据库键"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "表结构", body = ApiResponse<TableDescription>),
        (status = 404, description = "表不存在")
    )
)]
pub async fn describe_table(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((key, table)): Path<(String, String)>,
) -> ApiResult<TableDescription> {
    let scope = RequestScope::new(&state, &request_id);
    let data = state
        .service
        .describe_table(&key, &table)
        .await
        .map_err(|e| scope.fail(e))?;
    Ok(scope.reply(data))
}

/// 读取表中的数据行（按首列倒序）
#[utoipa::path(
    get,
    path = "/api/databases/{key}/tables/{table}/rows",
    tag = "rows",
    params(
        ("key" = String, Path, description = "数据库键"),
        ("table" = String, Path, description = "表名"),
        ListRowsQuery
    ),
    responses(
        (status = 200, description = "数据行", body = ApiResponse<TableRows>),
        (status = 404, description = "表不存在")
    )
)]
pub async fn list_rows(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((key, table)): Path<(String, String)>,
    Query(query): Query<ListRowsQuery>,
) -> ApiResult<TableRows> {
    let scope = RequestScope::new(&state, &request_id);
    let data = state
        .service
        .list_rows(&key, &table, query.limit)
        .await
        .map_err(|e| scope.fail(e))?;
    Ok(scope.reply(data))
}

/// 插入一行
#[utoipa::path(
    post,
    path = "/api/databases/{key}/tables/{table}/rows",
    tag = "rows",
    params(
        ("key" = String, Path, description = "数据库键"),
        ("table" = String, Path, description = "表名")
    ),
    request_body = RowValuesRequest,
    responses(
        (status = 200, description = "插入结果", body = ApiResponse<MutationResult>),
        (status = 400, description = "参数无效或语句执行失败")
    )
)]
pub async fn insert_row(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((key, table)): Path<(String, String)>,
    payload: Result<Json<RowValuesRequest>, JsonRejection>,
) -> ApiResult<MutationResult> {
    let scope = RequestScope::new(&state, &request_id);
    let req = scope.body(payload)?;
    req.validate().map_err(|e| scope.fail(e))?;
    let data = state
        .service
        .insert_row(&key, &table, &req.columns)
        .await
        .map_err(|e| scope.fail(e))?;
    Ok(scope.reply(data))
}

/// 按主键更新一行
#[utoipa::path(
    put,
    path = "/api/databases/{key}/tables/{table}/rows/{pk}",
    tag = "rows",
    params(
        ("key" = String, Path, description = "数据库键"),
        ("table" = String, Path, description = "表名"),
        ("pk" = String, Path, description = "主键值")
    ),
    request_body = RowValuesRequest,
    responses(
        (status = 200, description = "更新结果，未匹配时 row_found 为 false", body = ApiResponse<MutationResult>),
        (status = 422, description = "表没有主键")
    )
)]
pub async fn update_row(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((key, table, pk)): Path<(String, String, String)>,
    payload: Result<Json<RowValuesRequest>, JsonRejection>,
) -> ApiResult<MutationResult> {
    let scope = RequestScope::new(&state, &request_id);
    let req = scope.body(payload)?;
    req.validate().map_err(|e| scope.fail(e))?;
    let data = state
        .service
        .update_row(&key, &table, &pk, &req.columns)
        .await
        .map_err(|e| scope.fail(e))?;
    Ok(scope.reply(data))
}

/// 按主键删除一行
#[utoipa::path(
    delete,
    path = "/api/databases/{key}/tables/{table}/rows/{pk}",
    tag = "rows",
    params(
        ("key" = String, Path, description = "数据库键"),
        ("table" = String, Path, description = "表名"),
        ("pk" = String, Path, description = "主键值")
    ),
    responses(
        (status = 200, description = "删除结果，未匹配时 row_found 为 false", body = ApiResponse<MutationResult>),
        (status = 422, description = "表没有主键")
    )
)]
pub async fn delete_row(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((key, table, pk)): Path<(String, String, String)>,
) -> ApiResult<MutationResult> {
    let scope = RequestScope::new(&state, &request_id);
    let data = state
        .service
        .delete_row(&key, &table, &pk)
        .await
        .map_err(|e| scope.fail(e))?;
    Ok(scope.reply(data))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        mode: state.config.mode,
        databases: state.config.databases.len(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
    /// 部署模式
    pub mode: DeploymentMode,
    /// 已注册的数据库数量
    pub databases: usize,
}
