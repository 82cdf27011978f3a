//! Error taxonomy for the review workflow engine.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown submission/review/reviewer/appeal id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor is not the author, assigned reviewer or authorized decider.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation attempted from a status or stage that does not permit it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Reviewer is at max active reviews.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Duplicate active review for the same reviewer/submission/type.
    #[error("Conflicting assignment: {0}")]
    ConflictingAssignment(String),

    /// Reviewer is the submission's author.
    #[error("Self review forbidden: {0}")]
    SelfReviewForbidden(String),

    /// Database operation error (wraps sqlx::Error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) | Error::SelfReviewForbidden(_) => StatusCode::FORBIDDEN,
            Error::InvalidState(_)
            | Error::CapacityExceeded(_)
            | Error::ConflictingAssignment(_) => StatusCode::CONFLICT,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(Error::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Unauthorized("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::SelfReviewForbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::InvalidState("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::CapacityExceeded("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            Error::ConflictingAssignment("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }
}
