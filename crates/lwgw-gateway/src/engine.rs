//! Gateway engine - event handlers for both sides of the gateway
//!
//! Every handler is a translation step over the [`AssociationRegistry`]:
//! the engine keeps no association state of its own and rebuilds the
//! [`Device`] from the directory whenever it needs one.
//!
//! Handlers return `GatewayResult<()>` so callers (the HTTP ingress, tests)
//! can see the outcome, and log failures at the severity their category
//! calls for before returning.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use lwgw_core::{
    AssociationState, AttributePublisher, CommandPayload, CredentialStore, Device, DeviceDirectory,
    DeviceError, EventKind, FirmwareRole, GatewayError, GatewayResult, ImageRepository,
    NorthboundEvent, Observation, ProtocolEngine, ResourceContent, SessionHandle, TokenProvider,
};

use crate::firmware::{FirmwareState, FirmwareUpdateOrchestrator, UpdateResult};
use crate::registry::AssociationRegistry;
use crate::security::SecurityProvisioner;
use crate::settings::GatewaySettings;

/// External systems the engine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub protocol: Arc<dyn ProtocolEngine>,
    pub directory: Arc<dyn DeviceDirectory>,
    pub tokens: Arc<dyn TokenProvider>,
    pub images: Arc<dyn ImageRepository>,
    pub credentials: Arc<dyn CredentialStore>,
    pub publisher: Arc<dyn AttributePublisher>,
}

pub struct GatewayEngine {
    registry: Arc<AssociationRegistry>,
    protocol: Arc<dyn ProtocolEngine>,
    directory: Arc<dyn DeviceDirectory>,
    publisher: Arc<dyn AttributePublisher>,
    security: SecurityProvisioner,
    firmware: FirmwareUpdateOrchestrator,
    settings: GatewaySettings,
    /// Serialises cancel/observe sequences per endpoint
    observe_locks: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl GatewayEngine {
    pub fn new(collaborators: Collaborators, settings: GatewaySettings) -> Self {
        let registry = Arc::new(AssociationRegistry::new());
        let firmware = FirmwareUpdateOrchestrator::new(
            registry.clone(),
            collaborators.protocol.clone(),
            collaborators.images,
            collaborators.tokens,
            &settings,
        );

        Self {
            registry,
            protocol: collaborators.protocol,
            directory: collaborators.directory,
            publisher: collaborators.publisher,
            security: SecurityProvisioner::new(collaborators.credentials),
            firmware,
            settings,
            observe_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<AssociationRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Rebuild northbound associations for devices that already exist.
    ///
    /// Directory failures abort with an error; individual devices that are
    /// not protocol devices (or fail provisioning) are skipped.
    pub async fn bootstrap(&self) -> GatewayResult<usize> {
        debug!("Bootstrap started");
        let tenants = self.directory.list_tenants().await?;
        let mut bound = 0;

        for tenant in &tenants {
            let device_ids = self.directory.list_devices(tenant).await?;
            debug!(tenant = %tenant, count = device_ids.len(), "Listing devices");

            for device_id in device_ids {
                let Some(doc) = self.directory.get_device(&device_id, tenant).await? else {
                    warn!(tenant = %tenant, device_id = %device_id, "Listed device vanished");
                    continue;
                };
                let device = match Self::build_device(&doc, tenant) {
                    Ok(Some(device)) => device,
                    Ok(None) => continue,
                    Err(e) => {
                        e.report();
                        continue;
                    }
                };
                if let Err(e) = self.security.provision(&device) {
                    e.report();
                    continue;
                }
                self.registry
                    .bind_northbound(&device.client_endpoint, &device.device_id, tenant);
                bound += 1;
            }
        }

        info!(tenants = tenants.len(), devices = bound, "Bootstrap finished");
        Ok(bound)
    }

    // =========================================================================
    // Northbound
    // =========================================================================

    /// Dispatch a lifecycle or command event
    pub async fn handle_northbound(&self, event: &NorthboundEvent) -> GatewayResult<()> {
        let tenant = event.tenant();
        let result = match event.event {
            EventKind::Create | EventKind::Update => self.on_device_upsert(&event.data, tenant).await,
            EventKind::Remove => self.on_device_removed(&event.data, tenant).await,
            EventKind::Configure => self.on_configure(&event.data, tenant).await,
        };
        result.inspect_err(GatewayError::report)
    }

    async fn on_device_upsert(&self, data: &Value, tenant: &str) -> GatewayResult<()> {
        let Some(device) = Self::build_device(data, tenant)? else {
            return Ok(());
        };

        // Aborts the whole event before any association exists
        self.security.provision(&device)?;

        let record = self.registry.bind_northbound(
            &device.client_endpoint,
            &device.device_id,
            &device.tenant,
        );
        info!(
            endpoint = %device.client_endpoint,
            device_id = %device.device_id,
            state = %record.state(),
            "Northbound associated"
        );

        if record.is_bound() {
            self.refresh_observations(&device).await?;
        }
        Ok(())
    }

    async fn on_device_removed(&self, data: &Value, tenant: &str) -> GatewayResult<()> {
        let Some(device) = Self::build_device(data, tenant)? else {
            return Ok(());
        };
        let endpoint = &device.client_endpoint;

        {
            let lock = self.observe_lock(endpoint);
            let _guard = lock.lock().await;
            if let Some((_, session)) = self.registry.lookup(endpoint).as_ref().and_then(|r| r.bound_pair()) {
                if let Err(e) = self.protocol.cancel_all_observations(session).await {
                    warn!(endpoint = %endpoint, error = %e, "Failed to cancel observations");
                }
            }
            let state = self.registry.unbind_northbound(endpoint);
            info!(endpoint = %endpoint, device_id = %device.device_id, state = %state, "Northbound removed");
        }

        self.security.revoke(endpoint);
        self.prune_lock(endpoint);
        Ok(())
    }

    async fn on_configure(&self, data: &Value, tenant: &str) -> GatewayResult<()> {
        let command = CommandPayload::from_value(data)?;
        let Some(device) = self.fetch_device(&command.id, tenant).await? else {
            return Ok(());
        };
        let endpoint = &device.client_endpoint;

        let session = self
            .registry
            .lookup(endpoint)
            .filter(|r| r.is_bound())
            .and_then(|r| r.southbound)
            .ok_or_else(|| GatewayError::NotRegistered(device.device_id.clone()))?;

        for (label, value) in &command.attrs {
            if *label == self.settings.desired_version_label {
                let version = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                match self.firmware.apply_desired_version(endpoint, &version, &device).await {
                    Ok(outcome) => debug!(endpoint = %endpoint, outcome = ?outcome, "Firmware step done"),
                    Err(e) => e.report(),
                }
                continue;
            }

            let Some(attr) = device.attribute(label) else {
                warn!(device_id = %device.device_id, attribute = %label, "Skipping unknown attribute");
                continue;
            };
            let path = match attr.resource_path() {
                Ok(Some(path)) => path,
                Ok(None) => {
                    warn!(device_id = %device.device_id, attribute = %label, "Skipping attribute without resource path");
                    continue;
                }
                Err(e) => {
                    GatewayError::from(e).report();
                    continue;
                }
            };

            let result = if attr.is_executable() {
                debug!(endpoint = %endpoint, path = %path, "Executing");
                let argument = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                self.protocol
                    .execute_resource(&session, &path, Some(&argument))
                    .await
            } else if attr.is_writable() {
                debug!(endpoint = %endpoint, path = %path, "Writing");
                self.protocol.write_resource(&session, &path, value).await
            } else {
                warn!(device_id = %device.device_id, attribute = %label, "Skipping attribute that is neither writable nor executable");
                continue;
            };

            // Not retried; the rest of the command still runs
            if let Err(e) = result {
                error!(endpoint = %endpoint, attribute = %label, path = %path, error = %e, "Actuation failed");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Southbound registration
    // =========================================================================

    pub async fn on_registered(
        &self,
        session: SessionHandle,
        previous: Option<SessionHandle>,
    ) -> GatewayResult<()> {
        self.registered(session, previous)
            .await
            .inspect_err(GatewayError::report)
    }

    async fn registered(&self, session: SessionHandle, previous: Option<SessionHandle>) -> GatewayResult<()> {
        let endpoint = session.endpoint.clone();
        debug!(
            endpoint = %endpoint,
            registration_id = %session.registration_id,
            previous = ?previous.as_ref().map(|p| &p.registration_id),
            "Registered"
        );

        let record = self.registry.bind_southbound(&endpoint, session);
        let Some((north, _)) = record.bound_pair() else {
            debug!(endpoint = %endpoint, "Skipping observation, northbound not associated yet");
            return Ok(());
        };

        let Some(device) = self.fetch_device(&north.device_id, &north.tenant).await? else {
            return Ok(());
        };
        self.refresh_observations(&device).await
    }

    /// Refresh the session handle; observations are untouched
    pub async fn on_updated(&self, session: SessionHandle, previous: Option<SessionHandle>) -> GatewayResult<()> {
        debug!(
            endpoint = %session.endpoint,
            registration_id = %session.registration_id,
            previous = ?previous.as_ref().map(|p| &p.registration_id),
            "Registration updated"
        );
        let endpoint = session.endpoint.clone();
        self.registry.bind_southbound(&endpoint, session);
        Ok(())
    }

    pub async fn on_unregistered(
        &self,
        session: SessionHandle,
        expired: bool,
        replacement: Option<SessionHandle>,
    ) -> GatewayResult<()> {
        let endpoint = &session.endpoint;
        info!(
            endpoint = %endpoint,
            registration_id = %session.registration_id,
            expired,
            replaced = replacement.is_some(),
            "Device left"
        );

        let lock = self.observe_lock(endpoint);
        let cleared = {
            let _guard = lock.lock().await;
            let cleared = self
                .registry
                .unbind_southbound_session(endpoint, &session.registration_id);
            if cleared.is_some() {
                if let Err(e) = self.protocol.cancel_all_observations(&session).await {
                    debug!(endpoint = %endpoint, error = %e, "Cancel after unregistration failed");
                }
            }
            cleared
        };
        drop(lock);

        if cleared == Some(AssociationState::Unbound) {
            self.prune_lock(endpoint);
        }
        Ok(())
    }

    // =========================================================================
    // Southbound observations
    // =========================================================================

    /// Decode an observation response and publish it northbound
    pub async fn on_notification(
        &self,
        observation: &Observation,
        session: &SessionHandle,
        content: Option<ResourceContent>,
    ) -> GatewayResult<()> {
        self.notification(observation, session, content)
            .await
            .inspect_err(GatewayError::report)
    }

    async fn notification(
        &self,
        observation: &Observation,
        session: &SessionHandle,
        content: Option<ResourceContent>,
    ) -> GatewayResult<()> {
        let endpoint = &session.endpoint;
        debug!(endpoint = %endpoint, path = %observation.path, "Received notification");

        let value = match content {
            Some(ResourceContent::Single(value)) => value,
            Some(ResourceContent::Multiple) => {
                warn!(endpoint = %endpoint, path = %observation.path, "Unsupported content, skipping");
                return Ok(());
            }
            None => {
                warn!(endpoint = %endpoint, path = %observation.path, "Empty notification, skipping");
                return Ok(());
            }
        };

        let north = self
            .registry
            .lookup(endpoint)
            .filter(|r| r.is_bound())
            .and_then(|r| r.northbound)
            .ok_or_else(|| GatewayError::NotRegistered(endpoint.clone()))?;

        let Some(device) = self.fetch_device(&north.device_id, &north.tenant).await? else {
            return Ok(());
        };

        let attr = device.attribute_at(&observation.path).ok_or_else(|| {
            GatewayError::UnknownReference(format!(
                "path {} of device {} is not mapped",
                observation.path, device.device_id
            ))
        })?;

        let decoded = lwgw_conv::decode(&value, &attr.value_type)?;
        self.track_firmware(endpoint, &observation.path.to_string(), &decoded);

        let mut attrs = Map::new();
        attrs.insert(attr.label.clone(), decoded);
        self.publisher
            .publish(&north.device_id, &north.tenant, attrs, None)
            .await
    }

    pub fn on_observation_error(&self, observation: &Observation, session: &SessionHandle, error: &str) {
        error!(
            endpoint = %session.endpoint,
            registration_id = %observation.registration_id,
            path = %observation.path,
            error = %error,
            "Unable to handle notification"
        );
    }

    pub fn on_observation_cancelled(&self, observation: &Observation) {
        debug!(registration_id = %observation.registration_id, path = %observation.path, "Observation cancelled");
    }

    pub fn on_new_observation(&self, observation: &Observation, session: &SessionHandle) {
        debug!(endpoint = %session.endpoint, path = %observation.path, "New observation");
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Cancel everything on the live session, then observe every
    /// protocol-mapped readable attribute.
    async fn refresh_observations(&self, device: &Device) -> GatewayResult<()> {
        let endpoint = &device.client_endpoint;
        let lock = self.observe_lock(endpoint);
        let _guard = lock.lock().await;

        // The session may have changed or gone while waiting for the lock
        let Some(session) = self
            .registry
            .lookup(endpoint)
            .filter(|r| r.is_bound())
            .and_then(|r| r.southbound)
        else {
            debug!(endpoint = %endpoint, "No longer bound, skipping observation");
            return Ok(());
        };

        let cancelled = self.protocol.cancel_all_observations(&session).await?;
        debug!(endpoint = %endpoint, cancelled, "Previous observations cancelled");

        let mut observed = 0;
        for attr in device.readable_attributes() {
            let path = match attr.resource_path() {
                Ok(Some(path)) => path,
                Ok(None) => continue,
                Err(e) => {
                    warn!(endpoint = %endpoint, attribute = %attr.label, error = %e, "Not observing attribute with invalid path");
                    continue;
                }
            };
            match self.protocol.observe_resource(&session, &path).await {
                Ok(()) => observed += 1,
                Err(e) => error!(endpoint = %endpoint, path = %path, error = %e, "Failed to observe"),
            }
        }

        info!(endpoint = %endpoint, observed, "Observations established");
        Ok(())
    }

    /// Directory document turned into a device; `None` when it is not a
    /// protocol device.
    async fn fetch_device(&self, device_id: &str, tenant: &str) -> GatewayResult<Option<Device>> {
        let doc = self
            .directory
            .get_device(device_id, tenant)
            .await?
            .ok_or_else(|| GatewayError::UnknownReference(format!("device {} not found", device_id)))?;
        Self::build_device(&doc, tenant)
    }

    fn build_device(doc: &Value, tenant: &str) -> GatewayResult<Option<Device>> {
        match Device::from_document(doc, tenant) {
            Ok(device) => Ok(Some(device)),
            Err(DeviceError::NotApplicable(reason)) => {
                debug!(reason = %reason, "Not a protocol device, skipping");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn track_firmware(&self, endpoint: &str, path: &str, value: &Value) {
        if path == FirmwareRole::State.path() {
            match FirmwareState::from_value(value) {
                Some(FirmwareState::Downloaded) => {
                    info!(endpoint = %endpoint, "Firmware downloaded, ready for update trigger")
                }
                Some(state) => debug!(endpoint = %endpoint, state = %state, "Firmware state"),
                None => warn!(endpoint = %endpoint, value = %value, "Unknown firmware state"),
            }
        } else if path == FirmwareRole::UpdateResult.path() {
            match UpdateResult::from_value(value) {
                Some(result) if result.is_failure() => {
                    warn!(endpoint = %endpoint, result = %result, "Firmware update failed")
                }
                Some(result) => debug!(endpoint = %endpoint, result = %result, "Firmware update result"),
                None => warn!(endpoint = %endpoint, value = %value, "Unknown firmware update result"),
            }
        }
    }

    fn observe_lock(&self, endpoint: &str) -> Arc<AsyncMutex<()>> {
        self.observe_locks
            .lock()
            .entry(endpoint.to_string())
            .or_default()
            .clone()
    }

    /// Drop the endpoint's lock once nothing references it and the
    /// endpoint has no association left
    fn prune_lock(&self, endpoint: &str) {
        if self.registry.lookup(endpoint).is_some() {
            return;
        }
        let mut locks = self.observe_locks.lock();
        if locks.get(endpoint).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(endpoint);
        }
    }
}
