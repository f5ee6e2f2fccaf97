//! Error types for the sync client.

use sleepsync_core::sync::{classify_http_status, SyncRetryClass};
use sleepsync_core::Error as CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncClientError>;

#[derive(Debug, Error)]
pub enum SyncClientError {
    /// Transport failure (connect, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-2xx answer from a receiver.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SyncClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) | Self::InvalidRequest(_) => SyncRetryClass::Retryable,
            Self::Json(_) => SyncRetryClass::Permanent,
        }
    }
}

impl From<SyncClientError> for CoreError {
    fn from(err: SyncClientError) -> Self {
        match err {
            SyncClientError::Http(e) => CoreError::Network(e.to_string()),
            SyncClientError::Json(e) => CoreError::Serialization(e),
            SyncClientError::Api { status, message } => CoreError::Remote { status, message },
            SyncClientError::InvalidRequest(message) => CoreError::Unavailable(message),
        }
    }
}
