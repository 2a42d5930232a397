//! Client error type.

use thiserror::Error;

/// Failures talking to the dashboard backend.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Message suitable for the dashboard's error notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            ClientError::Request(err) if err.is_timeout() => {
                "The server took too long to respond.".to_string()
            }
            other => other.to_string(),
        }
    }
}
