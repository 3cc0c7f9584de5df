//! HTTP error mapping.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::error;

use docsets_shared::DocsetsError;

/// Any failure while serving a request. Always rendered as a plain-text 500.
#[derive(Debug)]
pub enum AppError {
    Docsets(DocsetsError),
    Internal(String),
}

impl From<DocsetsError> for AppError {
    fn from(err: DocsetsError) -> Self {
        Self::Docsets(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Docsets(err) => err.to_string(),
            AppError::Internal(message) => message,
        };
        error!(error = %message, "request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}
