//! Error types for value decoding

use thiserror::Error;

/// Errors that can occur while decoding a resource value
#[derive(Debug, Error)]
pub enum ConvError {
    /// Wire type tag this gateway cannot interpret
    #[error("unsupported resource type: {0}")]
    UnsupportedWireType(String),

    /// Opaque payload width does not fit the declared value type
    #[error("mapped as {declared} but received {actual} bytes")]
    InvalidWidth { declared: String, actual: usize },

    /// Tagged value whose payload does not match its tag
    #[error("invalid {tag} value: {reason}")]
    InvalidData { tag: String, reason: String },

    /// Floating point value with no JSON representation (NaN, infinity)
    #[error("value {0} is not representable")]
    NotRepresentable(f64),

    /// Opaque payload was not valid hex in the tagged form
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Result type for decoding operations
pub type ConvResult<T> = Result<T, ConvError>;

impl ConvError {
    pub(crate) fn invalid(tag: &str, reason: impl Into<String>) -> Self {
        ConvError::InvalidData {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}
