//! Error types for the backend client.

use thiserror::Error;

/// Errors that can occur when talking to the measurement backend.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed or returned an unexpected status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Credentials were refused.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with an error message of its own.
    #[error("Backend rejected request: {0}")]
    Rejected(String),

    /// Client misconfiguration (bad base URL, TLS setup).
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl AdapterError {
    /// Whether retrying the same request could succeed.
    ///
    /// Server errors (5xx) count as transient. A save is not idempotent and
    /// the backend writes it to two databases without a transaction, so a
    /// retry after a partial commit can store the row twice. A duplicate row
    /// is accepted here in exchange for not losing measurements to brief
    /// outages; 4xx rejections are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Timeout | AdapterError::Connection(_) | AdapterError::Http(_) => true,
            AdapterError::Parse(_)
            | AdapterError::Auth(_)
            | AdapterError::Rejected(_)
            | AdapterError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}
