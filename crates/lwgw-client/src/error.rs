//! Error types for the HTTP collaborators

use lwgw_core::GatewayError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to platform services
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Identifier cannot be carried as a single URL path segment
    #[error("Invalid path segment: {0:?}")]
    InvalidPathSegment(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Service returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Token could not be built or attached
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl ClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// As a device directory failure
    pub fn into_directory(self) -> GatewayError {
        GatewayError::Directory(self.to_string())
    }

    /// As an image manager or auth failure
    pub fn into_upstream(self) -> GatewayError {
        GatewayError::Upstream(self.to_string())
    }

    /// As a protocol engine failure
    pub fn into_southbound(self) -> GatewayError {
        GatewayError::Southbound(self.to_string())
    }
}
