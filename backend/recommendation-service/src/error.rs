use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the product corpus and interaction history collaborators.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for SourceError {
    fn from(err: sqlx::Error) -> Self {
        SourceError::Database(err.to_string())
    }
}

/// Failures inside the recommendation engine.
///
/// Only `Train` surfaces these to callers; query paths, including a missing
/// model (`ModelNotReady`), translate them into empty or popularity results.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(#[from] SourceError),

    #[error("Data source call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cannot train model: no approved products available")]
    EmptyCorpus,

    #[error("Cannot train model: product text yields an empty vocabulary")]
    EmptyVocabulary,

    #[error("Corrupt model snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Model is not ready")]
    ModelNotReady,

    #[error("Snapshot I/O error: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the failure came from a collaborator rather than the engine itself.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            EngineError::DataSourceUnavailable(_) | EngineError::Timeout(_)
        )
    }
}

/// HTTP-facing error for the thin actix adapter.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        let message = match self {
            AppError::BadRequest(msg)
            | AppError::ServiceUnavailable(msg)
            | AppError::Internal(msg) => msg.clone(),
        };

        HttpResponse::build(code).json(ErrorResponse {
            success: false,
            error: message,
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ModelNotReady => AppError::ServiceUnavailable(err.to_string()),
            e if e.is_source_failure() => AppError::ServiceUnavailable(e.to_string()),
            e => AppError::Internal(e.to_string()),
        }
    }
}
