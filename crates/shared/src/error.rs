//! Shared error types.

use serde::{Deserialize, Serialize};

/// Error code for frames the hub could not decode into an invocation.
pub const INVALID_INVOCATION: &str = "invalid_invocation";

/// Error detail carried by a failed `Completion`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct InvocationError {
    pub code: String,
    pub message: String,
}

impl InvocationError {
    pub fn invalid_invocation(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_INVOCATION.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
