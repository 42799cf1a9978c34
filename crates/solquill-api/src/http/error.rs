//! Application error type mapping to HTTP status codes.
//!
//! Only the WebSocket handshake produces HTTP errors; failures after the
//! upgrade travel as `error` events on the socket.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use solquill_types::error::FormatError;

#[derive(Debug)]
pub enum AppError {
    /// Malformed handshake parameters.
    Format(FormatError),
}

impl From<FormatError> for AppError {
    fn from(e: FormatError) -> Self {
        AppError::Format(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Format(err) = &self;
        let message = err.to_string();
        let (status, code) = match err {
            FormatError::InvalidOwner(_) => (StatusCode::BAD_REQUEST, "INVALID_OWNER"),
            FormatError::InvalidChatId(_) => (StatusCode::BAD_REQUEST, "INVALID_CHAT_ID"),
            FormatError::MalformedFrame(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
