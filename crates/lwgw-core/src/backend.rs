//! Collaborator traits - the seams between the gateway engine and the outside world
//!
//! The engine never talks to a transport directly. Every external system it
//! depends on is reached through one of these traits and injected at
//! construction time, so tests can substitute in-process fakes.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};

use lwgw_conv::WireValue;

use crate::error::GatewayResult;
use crate::models::{SecurityInfo, SessionHandle};
use crate::path::ResourcePath;

// =============================================================================
// Southbound
// =============================================================================

/// Resource operations against a live device session.
///
/// Each call completes before the engine issues a dependent follow-up; the
/// engine never pipelines operations against one session.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Read a single resource
    async fn read_resource(
        &self,
        session: &SessionHandle,
        path: &ResourcePath,
    ) -> GatewayResult<WireValue>;

    /// Write a value exactly as received from the platform
    async fn write_resource(
        &self,
        session: &SessionHandle,
        path: &ResourcePath,
        value: &Value,
    ) -> GatewayResult<()>;

    /// Execute a resource with an optional text argument
    async fn execute_resource(
        &self,
        session: &SessionHandle,
        path: &ResourcePath,
        argument: Option<&str>,
    ) -> GatewayResult<()>;

    /// Establish an observation on a resource
    async fn observe_resource(
        &self,
        session: &SessionHandle,
        path: &ResourcePath,
    ) -> GatewayResult<()>;

    /// Cancel every observation of the session, returning how many were active
    async fn cancel_all_observations(&self, session: &SessionHandle) -> GatewayResult<usize>;
}

/// Store of pre-shared keys consulted during DTLS handshakes
pub trait CredentialStore: Send + Sync {
    /// Add an entry, replacing any existing entry for the endpoint
    fn add(&self, info: SecurityInfo) -> GatewayResult<()>;

    /// Remove the endpoint's entry, returning it if present
    fn remove(&self, endpoint: &str) -> Option<SecurityInfo>;

    fn get(&self, endpoint: &str) -> Option<SecurityInfo>;
}

// =============================================================================
// Northbound
// =============================================================================

/// Logical device directory (device manager)
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn list_tenants(&self) -> GatewayResult<Vec<String>>;

    async fn list_devices(&self, tenant: &str) -> GatewayResult<Vec<String>>;

    /// Fetch a device document, `None` when the directory does not know it
    async fn get_device(&self, device_id: &str, tenant: &str) -> GatewayResult<Option<Value>>;
}

/// Bearer tokens for tenant-scoped platform calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, tenant: &str) -> GatewayResult<String>;
}

/// Firmware image lookup, download and URI construction
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Resolve the image id for a device label and version, `None` if absent
    async fn resolve_image(
        &self,
        tenant: &str,
        label: &str,
        version: &str,
    ) -> GatewayResult<Option<String>>;

    /// Download the image binary where the file server can serve it
    async fn download_image(&self, image_id: &str, token: &str) -> GatewayResult<PathBuf>;

    /// URI a device uses to pull the image; secure sessions get a
    /// distinct scheme and port
    fn build_download_uri(&self, image_id: &str, secure: bool) -> String;
}

/// Attribute publication channel
#[async_trait]
pub trait AttributePublisher: Send + Sync {
    async fn publish(
        &self,
        device_id: &str,
        tenant: &str,
        attrs: Map<String, Value>,
        metadata: Option<Value>,
    ) -> GatewayResult<()>;
}
