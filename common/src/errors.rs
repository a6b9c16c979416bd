//! Application error types.
//!
//! Every fallible operation returns [`AppResult`]. Errors are reported to the
//! immediate caller as values; the HTTP layer turns them into the standard
//! [`ApiResponse`] envelope through [`IntoResponse`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across all crates.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// The database key is not present in the registry.
    #[error("unknown database: {0}")]
    UnknownDatabase(String),

    /// The registry entry has no URL for the selected deployment mode.
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// The connection URL uses a scheme no driver is compiled for.
    #[error("unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// The driver could not open a connection (auth, network, DNS, timeout).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The table is not part of the catalog listing.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The table does not exist or has no primary key.
    #[error("primary key not found for table: {0}")]
    PrimaryKeyNotFound(String),

    /// The caller supplied a malformed identifier or column set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Request body failed declarative validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The driver rejected the statement (constraint, type mismatch, undefined column).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownDatabase(_) => "UNKNOWN_DATABASE",
            AppError::MissingConfiguration(_) => "MISSING_CONFIGURATION",
            AppError::UnsupportedDatabaseType(_) => "UNSUPPORTED_DATABASE_TYPE",
            AppError::ConnectionFailed(_) => "CONNECTION_FAILED",
            AppError::TableNotFound(_) => "TABLE_NOT_FOUND",
            AppError::PrimaryKeyNotFound(_) => "PRIMARY_KEY_NOT_FOUND",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ExecutionFailed(_) => "EXECUTION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnknownDatabase(_) | AppError::TableNotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingConfiguration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ConnectionFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::PrimaryKeyNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnsupportedDatabaseType(_)
            | AppError::InvalidArgument(_)
            | AppError::Validation(_)
            | AppError::ExecutionFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl AppError {
    /// Binds the error to the request that produced it, so the error
    /// envelope reports the same `meta` as a successful response would.
    pub fn for_request(self, request_id: impl Into<String>, service: impl Into<String>) -> RequestError {
        RequestError {
            error: self,
            request_id: Some(request_id.into()),
            service: Some(service.into()),
        }
    }
}

/// An [`AppError`] together with the request metadata of its envelope.
#[derive(Debug)]
pub struct RequestError {
    error: AppError,
    request_id: Option<String>,
    service: Option<String>,
}

impl RequestError {
    /// Returns the underlying error.
    pub fn error(&self) -> &AppError {
        &self.error
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let error = self.error;
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(code = error.code(), error = %error, "request failed");
        } else {
            tracing::warn!(code = error.code(), error = %error, "request rejected");
        }

        let mut body = ApiResponse::err(error.code(), error.to_string());
        body.meta.request_id = self.request_id;
        body.meta.service = self.service;
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        RequestError {
            error: self,
            request_id: None,
            service: None,
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::UnknownDatabase("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::ConnectionFailed("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::PrimaryKeyNotFound("logs".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::ExecutionFailed("constraint".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_request_error_envelope_carries_meta() {
        let err = AppError::TableNotFound("ghost".into()).for_request("req-7", "dashboard-service");
        assert!(matches!(err.error(), AppError::TableNotFound(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_codes_are_distinct_for_not_found_kinds() {
        assert_ne!(
            AppError::TableNotFound("t".into()).code(),
            AppError::PrimaryKeyNotFound("t".into()).code()
        );
    }
}
