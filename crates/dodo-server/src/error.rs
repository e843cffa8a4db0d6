//! HTTP error mapping.
//!
//! Every failure leaves the API as `{"error": "<message>"}` with a status
//! derived from the core error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use dodo_core::{AuthError, CoreError};

pub const INVALID_PAYLOAD: &str = "Invalid request payload.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_payload() -> Self {
        ApiError::BadRequest(INVALID_PAYLOAD.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized(err.to_string()),
            AuthError::InvalidToken => ApiError::Unauthorized(err.to_string()),
            AuthError::Provider(_) | AuthError::NotConfigured => {
                tracing::warn!(error = %err, "token verification failed");
                ApiError::Unauthorized(AuthError::InvalidToken.to_string())
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(_) | CoreError::NotApplicable { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            CoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CoreError::Auth(auth) => auth.into(),
            other => {
                tracing::error!(error = %other, "request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
