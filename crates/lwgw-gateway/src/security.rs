//! Pre-shared key provisioning

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use lwgw_core::{CredentialStore, Device, GatewayError, GatewayResult, SecurityInfo};

/// In-process credential store keyed by endpoint
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, SecurityInfo>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn add(&self, info: SecurityInfo) -> GatewayResult<()> {
        self.entries.write().insert(info.endpoint.clone(), info);
        Ok(())
    }

    fn remove(&self, endpoint: &str) -> Option<SecurityInfo> {
        self.entries.write().remove(endpoint)
    }

    fn get(&self, endpoint: &str) -> Option<SecurityInfo> {
        self.entries.read().get(endpoint).cloned()
    }
}

/// Extracts PSK material from a device and installs it in the credential store
pub struct SecurityProvisioner {
    store: Arc<dyn CredentialStore>,
}

impl SecurityProvisioner {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Validate the device's PSK declaration and replace its credential entry.
    ///
    /// Returns the installed entry, or `None` when the device declares no key.
    /// On any violation the store is left untouched.
    pub fn provision(&self, device: &Device) -> GatewayResult<Option<SecurityInfo>> {
        let Some(pair) = device.psk_pair()? else {
            debug!(endpoint = %device.client_endpoint, "No PSK declared, device is insecure");
            return Ok(None);
        };

        let key = hex::decode(&pair.key).map_err(|e| GatewayError::Security {
            device_id: device.device_id.clone(),
            reason: format!("key is not valid hex: {}", e),
        })?;

        let info = SecurityInfo {
            endpoint: device.client_endpoint.clone(),
            identity: pair.identity,
            key,
        };

        // Replace, never merge
        self.store.remove(&info.endpoint);
        self.store.add(info.clone())?;
        info!(endpoint = %info.endpoint, identity = %info.identity, "PSK provisioned");
        Ok(Some(info))
    }

    /// Drop the endpoint's credential entry
    pub fn revoke(&self, endpoint: &str) -> Option<SecurityInfo> {
        let removed = self.store.remove(endpoint);
        if removed.is_some() {
            info!(endpoint = %endpoint, "PSK revoked");
        }
        removed
    }
}
