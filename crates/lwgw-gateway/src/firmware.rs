//! Firmware update orchestration
//!
//! The orchestrator owns the first half of an update: compare the reported
//! version against the requested one, make the image available and hand the
//! device a download URI. The device then reports its progress on the
//! firmware state resource, and installation is triggered by a later command
//! on the update resource.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use lwgw_core::{
    Device, GatewayError, GatewayResult, ImageRepository, ProtocolEngine, ResourcePath,
    SessionHandle, TokenProvider,
};

use crate::registry::AssociationRegistry;
use crate::settings::GatewaySettings;

/// Firmware update state reported on `/5/0/3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirmwareState {
    Idle = 0,
    Downloading = 1,
    Downloaded = 2,
    Updating = 3,
}

impl FirmwareState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Idle),
            1 => Some(Self::Downloading),
            2 => Some(Self::Downloaded),
            3 => Some(Self::Updating),
            _ => None,
        }
    }

    /// Parse a decoded attribute value (number or numeric text)
    pub fn from_value(value: &Value) -> Option<Self> {
        code_of(value).and_then(Self::from_code)
    }
}

impl fmt::Display for FirmwareState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Updating => "updating",
        };
        f.write_str(s)
    }
}

/// Result of the last update attempt, reported on `/5/0/5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateResult {
    Initial = 0,
    Success = 1,
    NotEnoughFlash = 2,
    OutOfRam = 3,
    ConnectionLost = 4,
    IntegrityCheckFailure = 5,
    UnsupportedPackageType = 6,
    InvalidUri = 7,
    UpdateFailed = 8,
    UnsupportedProtocol = 9,
}

impl UpdateResult {
    pub fn from_code(code: i64) -> Option<Self> {
        let result = match code {
            0 => Self::Initial,
            1 => Self::Success,
            2 => Self::NotEnoughFlash,
            3 => Self::OutOfRam,
            4 => Self::ConnectionLost,
            5 => Self::IntegrityCheckFailure,
            6 => Self::UnsupportedPackageType,
            7 => Self::InvalidUri,
            8 => Self::UpdateFailed,
            9 => Self::UnsupportedProtocol,
            _ => return None,
        };
        Some(result)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        code_of(value).and_then(Self::from_code)
    }

    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Initial | Self::Success)
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::Success => "success",
            Self::NotEnoughFlash => "not enough flash",
            Self::OutOfRam => "out of RAM",
            Self::ConnectionLost => "connection lost",
            Self::IntegrityCheckFailure => "integrity check failure",
            Self::UnsupportedPackageType => "unsupported package type",
            Self::InvalidUri => "invalid URI",
            Self::UpdateFailed => "update failed",
            Self::UnsupportedProtocol => "unsupported protocol",
        };
        f.write_str(s)
    }
}

fn code_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// What [`FirmwareUpdateOrchestrator::apply_desired_version`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FirmwareOutcome {
    /// Device already reports the requested version
    AlreadyCurrent,
    /// Download URI written to the package URI resource
    UriDelivered { image_id: String, uri: String },
}

pub struct FirmwareUpdateOrchestrator {
    registry: Arc<AssociationRegistry>,
    engine: Arc<dyn ProtocolEngine>,
    images: Arc<dyn ImageRepository>,
    tokens: Arc<dyn TokenProvider>,
    version_path: String,
    package_uri_path: String,
}

impl FirmwareUpdateOrchestrator {
    pub fn new(
        registry: Arc<AssociationRegistry>,
        engine: Arc<dyn ProtocolEngine>,
        images: Arc<dyn ImageRepository>,
        tokens: Arc<dyn TokenProvider>,
        settings: &GatewaySettings,
    ) -> Self {
        Self {
            registry,
            engine,
            images,
            tokens,
            version_path: settings.version_path.clone(),
            package_uri_path: settings.package_uri_path.clone(),
        }
    }

    /// Bring `endpoint` towards `new_version`.
    ///
    /// Each step waits for the previous one; a failed image lookup or
    /// download aborts without retry and leaves the device untouched.
    pub async fn apply_desired_version(
        &self,
        endpoint: &str,
        new_version: &str,
        device: &Device,
    ) -> GatewayResult<FirmwareOutcome> {
        let session = self.session_for(endpoint)?;
        let version_path: ResourcePath = self.version_path.parse()?;

        let current = self
            .engine
            .read_resource(&session, &version_path)
            .await?
            .as_text();

        if current == new_version {
            info!(endpoint = %endpoint, version = %current, "Firmware already at desired version");
            return Ok(FirmwareOutcome::AlreadyCurrent);
        }

        info!(
            endpoint = %endpoint,
            current = %current,
            desired = %new_version,
            "Starting firmware update"
        );

        let token = self.tokens.get_token(&device.tenant).await?;
        let image_id = self
            .images
            .resolve_image(&device.tenant, &device.label, new_version)
            .await?
            .ok_or_else(|| GatewayError::ImageNotFound {
                label: device.label.clone(),
                version: new_version.to_string(),
            })?;

        let artifact = self.images.download_image(&image_id, &token).await?;
        debug!(image_id = %image_id, path = %artifact.display(), "Firmware image stored");

        // A PSK device only fetches over DTLS even if the engine did not flag the session
        let secure = session.secure || device.is_secure();
        let uri = self.images.build_download_uri(&image_id, secure);
        let package_path: ResourcePath = self.package_uri_path.parse()?;
        self.engine
            .write_resource(&session, &package_path, &Value::String(uri.clone()))
            .await?;

        info!(endpoint = %endpoint, image_id = %image_id, uri = %uri, "Firmware package URI delivered");
        Ok(FirmwareOutcome::UriDelivered { image_id, uri })
    }

    fn session_for(&self, endpoint: &str) -> GatewayResult<SessionHandle> {
        self.registry
            .lookup(endpoint)
            .filter(|r| r.is_bound())
            .and_then(|r| r.southbound)
            .ok_or_else(|| GatewayError::NotRegistered(endpoint.to_string()))
    }
}
