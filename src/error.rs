use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy surfaced at the API boundary.
///
/// Store and engine code returns these directly for rule violations and
/// wraps everything the database throws at us in `Persistence`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<libsql::Error> for AppError {
    fn from(error: libsql::Error) -> Self {
        AppError::Persistence(anyhow::Error::new(error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Persistence(anyhow::Error::new(error))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Persistence(e) => {
                tracing::error!(error = %format!("{e:#}"), "store operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match &self {
            // Auth failures keep the bare {msg} shape the sign-in flow uses.
            AppError::Unauthorized(msg) => json!({ "msg": msg }),
            AppError::Persistence(_) => json!({ "status": 0, "msg": "internal error" }),
            other => json!({ "status": 0, "msg": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub fn require_non_empty(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
