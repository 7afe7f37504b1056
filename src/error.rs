// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Global Application Error Enum.
/// Every failure of the evaluation pipeline surfaces as one of these kinds,
/// and the kind survives all the way to the HTTP response.
#[derive(Debug, Error)]
pub enum AppError {
    // 400 Bad Request: a required request field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    // 404 Not Found: unknown exam, shift or candidate.
    #[error("{0}")]
    NotFound(String),

    // 422: mandatory candidate/date/time fields absent from the markup.
    #[error("{0}")]
    Extraction(String),

    // 422: parsed sections do not line up with the configured subjects.
    #[error("response sheet has {sections} sections but the exam defines {subjects} subjects")]
    SchemaMismatch { sections: usize, subjects: usize },

    // 502: remote response sheet could not be fetched.
    #[error("{0}")]
    UpstreamFetch(String),

    // 500: storage failure.
    #[error("{0}")]
    Repository(String),

    // 409 Conflict (e.g., exam already exists)
    #[error("{0}")]
    Conflict(String),

    // 500: bootstrap and configuration failures.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Stable tag for the error kind, included in every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Extraction(_) => "extraction",
            AppError::SchemaMismatch { .. } => "schema_mismatch",
            AppError::UpstreamFetch(_) => "upstream_fetch",
            AppError::Repository(_) => "repository",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Extraction(_) | AppError::SchemaMismatch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Repository(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let error_message = match &self {
            AppError::Repository(msg) | AppError::Internal(msg) => {
                tracing::error!(kind, "Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::Repository`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Repository(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Repository(format!("migration failed: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamFetch("timed out fetching response sheet".to_string())
        } else {
            AppError::UpstreamFetch(format!("unable to fetch response sheet: {}", err))
        }
    }
}
