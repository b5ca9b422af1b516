//! API response types.

use serde::{Deserialize, Serialize};

/// Structured error body, e.g. `{"error":"Session not found"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Message-post whose session ID is missing or not registered.
    pub fn session_not_found() -> Self {
        Self::new("Session not found")
    }

    /// Request matching no route.
    pub fn not_found() -> Self {
        Self::new("Not found")
    }
}
