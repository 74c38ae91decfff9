// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub retry_after_ms: Option<u64>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after_ms: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
            retry_after_ms: self.retry_after_ms,
        });

        (status, body).into_response()
    }
}

/// Convert stagecast_core errors to HTTP errors
impl From<stagecast_core::Error> for AppError {
    fn from(err: stagecast_core::Error) -> Self {
        use stagecast_core::Error;

        match err {
            Error::NotFound(msg) => AppError::not_found(msg),
            Error::Expired => AppError::gone("Access session expired"),
            Error::Revoked => AppError::forbidden("Access session revoked"),
            Error::Unauthorized(msg) => AppError::forbidden(msg),
            Error::TooManyConcurrentViewers => {
                AppError::conflict("Access code is at its connection limit")
            }
            Error::ExhaustedCodeSpace => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "No access codes available, retry later",
            ),
            Error::RateLimited { retry_after_ms } => {
                let mut err =
                    AppError::new(StatusCode::TOO_MANY_REQUESTS, "Reaction rate limit exceeded");
                err.retry_after_ms = Some(retry_after_ms);
                err
            }
            Error::PayloadTooLarge { len, max } => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Message is {len} characters, maximum is {max}"),
            ),
            Error::InvalidReaction(msg) => {
                AppError::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            Error::ConnectionClosed => AppError::gone("Connection closed"),
            Error::InvalidInput(msg) => AppError::bad_request(msg),
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                AppError::internal_server_error("Internal server error")
            }
        }
    }
}

/// Convert serde_json errors to HTTP errors
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::bad_request(format!("JSON error: {}", err))
    }
}

/// Convert anyhow errors to HTTP errors
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Anyhow error: {}", err);
        AppError::internal_server_error("Internal server error")
    }
}
