use islandboard_core::entry::ApprovalStatus;
use islandboard_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entry not found: {0}")]
    NotFound(String),

    /// A transition lost the race against another writer.
    #[error("Entry '{id}' is {actual}, expected {expected}")]
    StatusChanged {
        id: String,
        expected: ApprovalStatus,
        actual: String,
    },

    /// A stored row could not be mapped back into the domain model.
    #[error("Corrupt row '{id}': {message}")]
    Corrupt { id: String, message: String },

    #[error("Preference file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound {
                entity: "DataEntry",
                id,
            },
            e @ StoreError::StatusChanged { .. } => CoreError::Conflict(e.to_string()),
            StoreError::Database(e @ (sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))) => {
                CoreError::BackendUnavailable(format!("store unreachable: {e}"))
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}
