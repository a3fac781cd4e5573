//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body uses the same envelope as successful responses, with an
//! `error` flag:
//!
//! ```json
//! {"msg": "unknown queue `billing`", "error": true}
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use callstats_core::CoreError;
use tracing::{error, warn};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A service call failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body or parameters were rejected before any work.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// The access key was missing or wrong.
    #[error("{0}")]
    Unauthorized(String),

    /// No route matches the request.
    #[error("{0}")]
    NotFound(String),

    /// The server could not check the request (e.g. unreadable key file).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::BadRequest(errors.to_string())
    }
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Core(CoreError::Store(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Core(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!(error = %message, "request failed");
        } else if let Self::Core(ref e) = self
            && e.is_channel_failure()
        {
            warn!(error = %message, "engine unavailable");
        }

        let body = serde_json::json!({
            "msg": message,
            "error": true,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use callstats_esl::EslError;

    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (
                ApiError::Core(CoreError::Validation(String::from("unknown queue"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Core(CoreError::Channel(EslError::Connection(String::from("refused")))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Core(CoreError::Store(String::from("disk full"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Unauthorized(String::from("no key")),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::NotFound(String::from("/nope")),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }
}
