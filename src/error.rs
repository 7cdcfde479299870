/*
 * Responsibility
 * - AppError shared by actions, middleware and the dispatcher
 * - status-carrying errors vs internal faults (status_code())
 * - IntoResponse (plain text body; internal faults never echo details)
 */
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::services::auth::jwt::TokenError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Custom { status: StatusCode, message: String },

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn custom(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Custom {
            status,
            message: message.into(),
        }
    }

    /// Status carried by the error, if any.
    ///
    /// `None` marks an internal fault: it is logged server-side and the client only
    /// sees a generic 500.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            AppError::Validation(_) => Some(StatusCode::BAD_REQUEST),
            AppError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            AppError::Forbidden => Some(StatusCode::FORBIDDEN),
            AppError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            AppError::Conflict(_) => Some(StatusCode::CONFLICT),
            AppError::Custom { status, .. } => Some(*status),
            AppError::Token(_) | AppError::Internal(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.status_code() {
            Some(status) => plain_text(status, self.to_string()),
            None => {
                error!(error = ?self, "unhandled error");
                internal_error()
            }
        }
    }
}

pub(crate) fn plain_text(status: StatusCode, message: String) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        message,
    )
        .into_response()
}

pub(crate) fn internal_error() -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    plain_text(
        status,
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string(),
    )
}
