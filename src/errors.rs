use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned on every failed request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Unprocessable Entity")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Service-level error taxonomy
///
/// NotFound -> 404, ValidationError -> 422, InvalidInput -> 400,
/// Unauthorized -> 401, Forbidden -> 403, UpstreamError -> 500,
/// DatabaseError/InternalError -> 500.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Upstream directory error: {0}")]
    UpstreamError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} with ID {} not found", entity, id))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UpstreamError(_)
            | Self::DatabaseError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal detail stays in the logs, not in the response body
        let message = match &self {
            Self::DatabaseError(err) => {
                tracing::error!(error = %err, "database error");
                "A database error occurred".to_string()
            }
            Self::InternalError(msg) => {
                tracing::error!(error = %msg, "internal error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
