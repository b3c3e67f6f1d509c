use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// A single failed validation rule, reported under `issues` in the 400 body.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub path: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Validation failed")]
    Validation(Vec<Issue>),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl ApiError {
    /// Shortcut for a single-field validation failure.
    pub fn invalid(path: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![Issue {
            path,
            message: message.into(),
        }])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Validation(issues) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Validation failed", "issues": issues })),
            )
                .into_response(),
            ApiError::Db(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
