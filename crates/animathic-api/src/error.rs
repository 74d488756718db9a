//! API error types: coarsened down to `{ kind, message }` at the HTTP edge
//! (spec §7 "surfaced to user").

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use animathic_models::ErrorKind;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server is busy, try again later")]
    Busy,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] animathic_storage::StorageError),

    #[error("Metadata store error: {0}")]
    Db(#[from] animathic_db::DbError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized(_) | ApiError::TokenExpired => ErrorKind::Auth,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::BadRequest(_) => ErrorKind::InvalidPrompt,
            ApiError::Busy => ErrorKind::Busy,
            ApiError::Internal(_) => ErrorKind::DbFailed,
            ApiError::Storage(e) => e.kind(),
            ApiError::Db(e) => e.kind(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    kind: ErrorKind,
    message: String,
    /// Set on expired bearer tokens (spec §6: "Expired tokens surface as a
    /// structured error carrying `requires_refresh=true`").
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    requires_refresh: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        // Never leak raw stderr or adapter internals in production (spec §7).
        let message = match &self {
            ApiError::Internal(_) | ApiError::Db(_) | ApiError::Storage(_) => {
                if std::env::var("ENVIRONMENT").map(|e| e.eq_ignore_ascii_case("production")).unwrap_or(false) {
                    "an internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let requires_refresh = matches!(self, ApiError::TokenExpired);

        (status, Json(ErrorResponse { kind, message, requires_refresh })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn token_expired_sets_requires_refresh() {
        let response = ApiError::token_expired().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["requires_refresh"], true);
        assert_eq!(json["kind"], "auth");
    }

    #[tokio::test]
    async fn other_errors_omit_requires_refresh() {
        let response = ApiError::not_found("video 1").into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("requires_refresh").is_none());
    }
}
