//! Credential store entries

use serde::{Deserialize, Serialize};

/// Pre-shared key entry for one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub endpoint: String,
    pub identity: String,
    /// Raw key bytes
    #[serde(with = "hex::serde")]
    pub key: Vec<u8>,
}
