// ❗ Error taxonomy for enrollment and screening
// Every failure aborts the current request; nothing is retried here.

use crate::schema::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntitySenseError {
    /// Required identity field missing or blank (rejected before any remote call)
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// Provider unreachable, timed out, or returned no usable vector
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Mismatched vector lengths while scoring (data-integrity bug)
    #[error("invalid vector: {0}")]
    InvalidVector(String),

    /// Persistence layer failure
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EntitySenseError {
    /// Stable code surfaced to API callers
    pub fn kind(&self) -> &'static str {
        match self {
            EntitySenseError::Validation(_) => "VALIDATION_ERROR",
            EntitySenseError::EmbeddingUnavailable(_) => "EMBEDDING_UNAVAILABLE",
            EntitySenseError::InvalidVector(_) => "INVALID_VECTOR",
            EntitySenseError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// True for failures caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, EntitySenseError::Validation(_))
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<rusqlite::Error> for EntitySenseError {
    fn from(err: rusqlite::Error) -> Self {
        EntitySenseError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for EntitySenseError {
    fn from(err: serde_json::Error) -> Self {
        EntitySenseError::StoreUnavailable(format!("corrupt stored column: {}", err))
    }
}

impl From<reqwest::Error> for EntitySenseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EntitySenseError::EmbeddingUnavailable(format!("provider timed out: {}", err))
        } else {
            EntitySenseError::EmbeddingUnavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, EntitySenseError>;
