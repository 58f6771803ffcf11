use thiserror::Error;

/// Engine-level error taxonomy.
///
/// `InvalidInput` and `InvalidTransition` are resolved locally and are never
/// worth retrying. `StoreUnavailable` is transient: mutating calls may be
/// retried safely because status transitions are idempotent and message
/// appends are deduplicated by id.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
