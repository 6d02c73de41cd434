use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// RepoError
///
/// Failures reported by a persistence backend. The store translates its native
/// errors (sqlx, lock poisoning, ...) into one of these at its boundary.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The unique constraint on `posts.slug` rejected the write.
    #[error("slug `{0}` is already taken")]
    SlugTaken(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        RepoError::Unavailable(e.to_string())
    }
}

/// AppError
///
/// The error taxonomy of the blog core. Handlers return it directly and axum turns it
/// into a status code plus a `{"error": "..."}` body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// Missing or invalid session.
    #[error("Unauthorized")]
    Unauthorized,

    /// Wrong admin password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A required secret (admin password or signing key) is missing or unusable.
    #[error("Server misconfigured")]
    Misconfigured,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::Storage(e.to_string())
    }
}

/// ErrorBody
///
/// Wire shape of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Misconfigured | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Storage(detail) => {
                // Store details stay in the logs.
                tracing::error!("storage failure: {}", detail);
                "Internal server error".to_string()
            }
            AppError::Misconfigured => {
                tracing::error!("session secrets unusable; check ADMIN_PASSWORD and SESSION_SECRET");
                self.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}
