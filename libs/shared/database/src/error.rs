use thiserror::Error;

use shared_models::error::AppError;

/// Failures talking to the PostgREST / Storage backend.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DbError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => DbError::Unauthorized(body),
            404 => DbError::NotFound(body),
            409 => DbError::Conflict(body),
            _ => DbError::Api { status, message: body },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

impl From<reqwest::Error> for DbError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            DbError::Decode(error.to_string())
        } else {
            DbError::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(error: serde_json::Error) -> Self {
        DbError::Decode(error.to_string())
    }
}

impl From<DbError> for AppError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::NotFound(msg) => AppError::NotFound(msg),
            DbError::Conflict(msg) => AppError::Conflict(msg),
            DbError::InvalidRequest(msg) => AppError::BadRequest(msg),
            other => AppError::Database(other.to_string()),
        }
    }
}
