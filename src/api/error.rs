//! Error types for backend calls.

use thiserror::Error;

/// Failure talking to the backend REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("rejected by backend: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Text suitable for showing next to the action that failed.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "could not reach the server, please try again".to_string(),
            ApiError::Status { message, .. } | ApiError::Rejected(message) => message.clone(),
            ApiError::Decode(_) => "the server sent an unexpected response".to_string(),
        }
    }
}
