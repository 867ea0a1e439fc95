//! Secure router client error taxonomy.

use thiserror::Error;

/// Result type for router client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the secure router client.
///
/// Every failure while opening a router response collapses into
/// [`ClientError::Security`] with one fixed message, so callers and anyone
/// observing error traffic learn nothing about which stage rejected the
/// package. The cause is kept in a non-displayed field for local
/// diagnostics.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("payload too large: {size} bytes exceeds the {limit} byte ceiling")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("insecure channel: {0} is not https and allow_http is disabled")]
    InsecureChannel(String),

    #[error("decryption failed: integrity check or authentication failed")]
    Security {
        /// Never part of the display.
        detail: String,
    },

    #[error("malformed package: {0}")]
    MalformedPackage(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid server response: {0}")]
    InvalidServerResponse(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("server error: {0}")]
    Server(String),
}

impl ClientError {
    pub(crate) fn security(cause: impl std::fmt::Display) -> Self {
        ClientError::Security {
            detail: cause.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Connection(format!("request timed out: {e}"))
        } else {
            ClientError::Connection(e.to_string())
        }
    }
}
