//! Engine settings

use serde::{Deserialize, Serialize};

/// Label of the command attribute that requests a firmware version
pub const DEFAULT_DESIRED_VERSION_LABEL: &str = "desirable_fw_version";
/// Device object firmware version resource
pub const DEFAULT_VERSION_PATH: &str = "/3/0/3";
/// Firmware update object package URI resource
pub const DEFAULT_PACKAGE_URI_PATH: &str = "/5/0/1";

/// Tunables for [`crate::GatewayEngine`] and the firmware orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Reserved command label routed to the firmware orchestrator
    pub desired_version_label: String,
    /// Resource reporting the device's current firmware version
    pub version_path: String,
    /// Resource the download URI is written to
    pub package_uri_path: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            desired_version_label: DEFAULT_DESIRED_VERSION_LABEL.to_string(),
            version_path: DEFAULT_VERSION_PATH.to_string(),
            package_uri_path: DEFAULT_PACKAGE_URI_PATH.to_string(),
        }
    }
}
