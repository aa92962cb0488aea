use crate::entry::ApprovalStatus;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// A raw record is malformed or incomplete and never enters the queue.
    #[error("Validation failed on '{field}': {message}")]
    Validation { field: String, message: String },

    /// An illegal or under-justified state change. State is left unchanged.
    #[error("Invalid transition '{action}' from '{from}': {reason}")]
    InvalidTransition {
        from: ApprovalStatus,
        action: String,
        reason: String,
    },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The scraper REST API or WebSocket could not be reached in time.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Some items in a batch transition failed; the others were kept.
    #[error("Batch partially failed: {succeeded} succeeded, {failed} failed")]
    PartialBatchFailure { succeeded: usize, failed: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::Validation`] naming `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code, e.g. `"INVALID_TRANSITION"`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Self::PartialBatchFailure { .. } => "PARTIAL_BATCH_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::Conflict(_))
    }
}
