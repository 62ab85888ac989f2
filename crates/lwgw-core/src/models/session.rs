//! Southbound session and observation handles

use serde::{Deserialize, Serialize};

use crate::path::ResourcePath;

/// Live registration of a device with the protocol engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Registration id assigned by the protocol engine, new on every registration
    pub registration_id: String,
    pub endpoint: String,
    /// Peer address as seen by the protocol engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Session runs over DTLS
    #[serde(default)]
    pub secure: bool,
    /// Registration lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<u64>,
}

impl SessionHandle {
    pub fn new(registration_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            endpoint: endpoint.into(),
            address: None,
            secure: false,
            lifetime: None,
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

/// Standing subscription on one resource of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub registration_id: String,
    pub path: ResourcePath,
}
