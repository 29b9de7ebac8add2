//! Error types: sandbox faults and caller-facing API errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::domain::{QuestionId, TopicId};

/// Faults of the sandbox itself. A program exiting non-zero is not one of these.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to create temp file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Failed to write temp file: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to start interpreter '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to collect process output: {0}")]
    Wait(#[source] std::io::Error),
}

/// Request-level failures, resolved before any grading happens.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No code provided")]
    EmptySubmission,

    #[error("Question {0} not found")]
    QuestionNotFound(QuestionId),

    #[error("Topic {0} not found")]
    TopicNotFound(TopicId),

    #[error("Topic {0} is locked")]
    TopicLocked(TopicId),

    #[error("Missing or empty X-User-Id header")]
    Unauthenticated,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::EmptySubmission => StatusCode::BAD_REQUEST,
            ApiError::QuestionNotFound(_) | ApiError::TopicNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TopicLocked(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
