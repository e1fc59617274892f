//! Shared API types: the unified HTTP error response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::domain::chat::ChatError;

/// Standard API error response.
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest { code: code.into(), message: message.into() }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound { code: code.into(), message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable { message: message.into() }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::RoomNotFound => ApiError::not_found("ROOM_NOT_FOUND", "room not found"),
            ChatError::InvalidOptions(msg) => ApiError::bad_request("INVALID_OPTIONS", msg),
            ChatError::RoomNotReady | ChatError::RoomNotReceiving | ChatError::RoomNotShutdown => {
                tracing::error!(error = %err, "room lifecycle error");
                ApiError::service_unavailable("room is not currently available")
            }
            ChatError::NotListening | ChatError::NotBroadcasting | ChatError::SendTimedOut => {
                tracing::warn!(error = %err, "participant rendezvous failed");
                ApiError::service_unavailable("could not establish connection")
            }
            ChatError::ExpectedClose => ApiError::internal("unexpected close during request handling"),
            ChatError::Transport(msg) => {
                tracing::warn!(%msg, "websocket transport error");
                ApiError::internal("transport error")
            }
            ChatError::FailedToPublish(e) => {
                tracing::warn!(error = %e, "pub/sub publish failed");
                ApiError::internal("failed to publish message")
            }
            ChatError::Data(e) => {
                tracing::error!(error = %e, "data layer error");
                ApiError::internal("database operation failed")
            }
            ChatError::PubSub(e) => {
                tracing::error!(error = %e, "pub/sub error");
                ApiError::internal("pub/sub operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, "bad_request", code, message),
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
            ),
            Self::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "INTERNAL".to_string(), message)
            }
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}
