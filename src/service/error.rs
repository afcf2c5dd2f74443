use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;
use validator::ValidationErrors;

use crate::error::{ErrorMessage, HttpError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Import row {line} skipped: {reason}")]
    ImportRow { line: usize, reason: String },

    /// A batch failed; `inserted` rows from earlier batches stay committed.
    #[error("Import stopped after {inserted} rows: {reason}")]
    ImportInterrupted { inserted: u64, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        ServiceError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Other(err.to_string())
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(errors) => HttpError::invalid_input(errors),

            ServiceError::NotFound(_) => HttpError::not_found(error.to_string()),

            // Internal details stay in the log; callers only see a fixed message.
            _ => {
                tracing::error!("request failed: {}", error);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::DataIntegrity(_)
            | ServiceError::ImportRow { .. }
            | ServiceError::ImportInterrupted { .. }
            | ServiceError::Database(_)
            | ServiceError::Timeout(_)
            | ServiceError::Cache(_)
            | ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
