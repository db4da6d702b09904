use crate::domain::board::NoteRuleError;
use crate::domain::scoring::ScoringError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("survey is incomplete: {} answers missing", .missing.len())]
    IncompleteSubmission { missing: Vec<usize> },

    #[error("answer {value} for question {index} must be between 1 and 6")]
    OutOfRangeAnswer { index: usize, value: i64 },

    #[error("question {0} does not exist")]
    UnknownQuestion(usize),

    #[error("complete the career anchor survey first")]
    MissingResult,

    #[error("the report service is currently unavailable")]
    NotConfigured,

    #[error("the report service failed, please try again later")]
    UpstreamError(String),

    #[error("the report service returned an unreadable answer, please try again")]
    MalformedResponse,

    #[error("you are not allowed to do this")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("too many attempts, try again later")]
    RateLimited,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::UnknownQuestion(index) => AppError::UnknownQuestion(index),
            ScoringError::IncompleteSubmission { missing } => {
                AppError::IncompleteSubmission { missing }
            }
            ScoringError::OutOfRangeAnswer { index, value } => {
                AppError::OutOfRangeAnswer { index, value }
            }
        }
    }
}

impl From<NoteRuleError> for AppError {
    fn from(err: NoteRuleError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::IncompleteSubmission { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INCOMPLETE_SUBMISSION")
            }
            AppError::OutOfRangeAnswer { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "OUT_OF_RANGE_ANSWER")
            }
            AppError::UnknownQuestion(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNKNOWN_QUESTION"),
            AppError::MissingResult => (StatusCode::CONFLICT, "MISSING_RESULT"),
            AppError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            AppError::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AppError::MalformedResponse => (StatusCode::BAD_GATEWAY, "MALFORMED_RESPONSE"),
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        match &self {
            AppError::Internal(err) => tracing::error!("Internal error: {:#}", err),
            AppError::UpstreamError(detail) => tracing::error!("Report service error: {}", detail),
            _ => {}
        }

        let mut body = json!({
            "error": self.to_string(),
            "code": code,
        });
        if let AppError::IncompleteSubmission { missing } = &self {
            body["missing"] = json!(missing);
        }

        (status, Json(body)).into_response()
    }
}
