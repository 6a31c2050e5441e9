//! API error types and handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use bookshelf::BookshelfError;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from client.
    BadRequest(String),
    /// Error from the bookshelf library.
    Bookshelf(BookshelfError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Bookshelf(e) => match e {
                BookshelfError::ConfigMissing(_) | BookshelfError::Config(_) => {
                    (StatusCode::BAD_REQUEST, "config_error")
                }
                BookshelfError::MissingColumn { .. } | BookshelfError::EmptyData(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "data_error")
                }
                BookshelfError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                BookshelfError::SourceUnavailable(_)
                | BookshelfError::Transport(_)
                | BookshelfError::Backend(_)
                | BookshelfError::Http(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status();
        let message = match self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::Bookshelf(e) => e.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<BookshelfError> for ApiError {
    fn from(err: BookshelfError) -> Self {
        ApiError::Bookshelf(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Bookshelf(e) => write!(f, "Bookshelf error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}
