//! Common error types for the gateway

use lwgw_conv::ConvError;
use thiserror::Error;

use crate::path::PathError;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Outcome of building a [`crate::Device`] from a logical device document
/// when the document cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Document is well formed but does not describe a protocol device
    #[error("not a protocol device: {0}")]
    NotApplicable(String),

    /// Document is missing required fields or has the wrong shape
    #[error("malformed device document: {0}")]
    Malformed(String),
}

/// Errors that can occur while handling gateway events
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing required fields or unparseable input
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// PSK material present but invalid or incomplete
    #[error("Security violation for device {device_id}: {reason}")]
    Security { device_id: String, reason: String },

    /// Endpoint has no live association
    #[error("Device {0} is not registered")]
    NotRegistered(String),

    /// Endpoint, device or path with no current record or mapping
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// Wire value could not be interpreted per its declared type
    #[error("Decode error: {0}")]
    Decode(#[from] ConvError),

    /// Resource path could not be parsed when dereferenced
    #[error("Invalid resource path: {0}")]
    Path(#[from] PathError),

    /// No confirmed image for the requested label/version
    #[error("Image not found: label={label}, version={version}")]
    ImageNotFound { label: String, version: String },

    /// Image manager or auth service failure
    #[error("Upstream fetch failed: {0}")]
    Upstream(String),

    /// Directory (device manager) failure
    #[error("Directory error: {0}")]
    Directory(String),

    /// Protocol engine rejected or failed an operation
    #[error("Southbound operation failed: {0}")]
    Southbound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error taxonomy used for log severity and HTTP status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MalformedInput,
    SecurityViolation,
    StaleReference,
    DecodeError,
    UpstreamFailure,
    Internal,
}

impl GatewayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::Malformed(_) | GatewayError::Path(_) => ErrorCategory::MalformedInput,
            GatewayError::Security { .. } => ErrorCategory::SecurityViolation,
            GatewayError::NotRegistered(_) | GatewayError::UnknownReference(_) => {
                ErrorCategory::StaleReference
            }
            GatewayError::Decode(_) => ErrorCategory::DecodeError,
            GatewayError::ImageNotFound { .. }
            | GatewayError::Upstream(_)
            | GatewayError::Directory(_)
            | GatewayError::Southbound(_) => ErrorCategory::UpstreamFailure,
            GatewayError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Log this error at the severity its category calls for.
    ///
    /// Stale references are expected under concurrent event streams and are
    /// logged as warnings; everything else is an error.
    pub fn report(&self) {
        match self.category() {
            ErrorCategory::StaleReference => tracing::warn!(error = %self, "Event dropped"),
            _ => tracing::error!(error = %self, "Event failed"),
        }
    }
}

impl From<DeviceError> for GatewayError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::NotApplicable(msg) => GatewayError::UnknownReference(msg),
            DeviceError::Malformed(msg) => GatewayError::Malformed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            GatewayError::NotRegistered("dev".into()).category(),
            ErrorCategory::StaleReference
        );
        assert_eq!(
            GatewayError::Decode(ConvError::UnsupportedWireType("objlnk".into())).category(),
            ErrorCategory::DecodeError
        );
        assert_eq!(
            GatewayError::ImageNotFound {
                label: "sensor".into(),
                version: "1.1".into()
            }
            .category(),
            ErrorCategory::UpstreamFailure
        );
    }

    #[test]
    fn test_device_error_conversion() {
        let err: GatewayError = DeviceError::Malformed("missing id".into()).into();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }
}
