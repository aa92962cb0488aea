use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use islandboard_core::error::CoreError;
use islandboard_db::StoreError;
use islandboard_live::ScraperApiError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses
/// of the shape `{ "error", "code", "retryable" }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `islandboard_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A request DTO failed `validator` checks.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or malformed admin identity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Core(err.into())
    }
}

impl From<ScraperApiError> for AppError {
    fn from(err: ScraperApiError) -> Self {
        AppError::Core(err.into())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(core) => match core {
                CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
                CoreError::InvalidTransition { .. } | CoreError::Conflict(_) => {
                    StatusCode::CONFLICT
                }
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::PartialBatchFailure { .. } => StatusCode::MULTI_STATUS,
                CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Core(core) => core.code(),
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Core(core) if core.is_retryable())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Core(CoreError::Internal(msg)) | AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
            AppError::Core(CoreError::BackendUnavailable(msg)) => {
                tracing::warn!(error = %msg, "Backend unavailable");
                self.to_string()
            }
            AppError::Validation(errors) => errors.to_string(),
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": self.code(),
            "retryable": self.is_retryable(),
        });

        (status, axum::Json(body)).into_response()
    }
}
