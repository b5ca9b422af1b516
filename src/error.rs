//! Error types for mcp-sse-bridge.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::ErrorResponse;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No open session is registered for the given request target.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The channel has already reported closure.
    #[error("channel closed")]
    ChannelClosed,

    /// `start` was called on a channel that is already streaming.
    #[error("channel already started")]
    AlreadyStarted,

    /// A protocol engine is already attached to the channel.
    #[error("channel already connected to a protocol engine")]
    AlreadyConnected,

    /// Posted message did not declare a JSON content type.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Request body could not be read (client abort or size limit).
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// Posted message is not valid JSON.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    /// Protocol engine failure.
    #[error("protocol engine error: {0}")]
    Engine(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// HTTP status reported to the client when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::ChannelClosed => StatusCode::GONE,
            Self::UnsupportedContentType(_) | Self::BodyRead(_) | Self::InvalidMessage(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::AlreadyStarted
            | Self::AlreadyConnected
            | Self::Engine(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let body = match self {
            // Routing misses keep the fixed wire message; the target stays in logs
            Self::SessionNotFound(_) => ErrorResponse::session_not_found(),
            ref other => ErrorResponse::new(other.to_string()),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Convenience Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
