//! Recording fakes for the engine's collaborators

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use lwgw_core::{
    AttributePublisher, DeviceDirectory, GatewayError, GatewayResult, ImageRepository,
    ProtocolEngine, ResourcePath, SessionHandle, TokenProvider, WireValue,
};
use lwgw_gateway::{Collaborators, GatewayEngine, GatewaySettings, MemoryCredentialStore};

// =============================================================================
// Protocol engine
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Read(String, String),
    Write(String, String, Value),
    Execute(String, String, Option<String>),
    Observe(String, String),
    CancelAll(String),
}

#[derive(Default)]
pub struct FakeProtocol {
    pub calls: Mutex<Vec<Call>>,
    /// Active observations per endpoint
    pub active: Mutex<HashMap<String, Vec<String>>>,
    pub resources: Mutex<HashMap<String, WireValue>>,
    pub fail_writes: Mutex<bool>,
}

impl FakeProtocol {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Write(..) | Call::Execute(..)))
            .collect()
    }

    pub fn observe_calls(&self, endpoint: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Observe(e, p) if e == endpoint => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn active(&self, endpoint: &str) -> Vec<String> {
        let mut paths = self.active.lock().get(endpoint).cloned().unwrap_or_default();
        paths.sort();
        paths
    }

    pub fn set_resource(&self, path: &str, value: WireValue) {
        self.resources.lock().insert(path.to_string(), value);
    }
}

#[async_trait]
impl ProtocolEngine for FakeProtocol {
    async fn read_resource(&self, session: &SessionHandle, path: &ResourcePath) -> GatewayResult<WireValue> {
        self.calls
            .lock()
            .push(Call::Read(session.endpoint.clone(), path.to_string()));
        self.resources
            .lock()
            .get(&path.to_string())
            .cloned()
            .ok_or_else(|| GatewayError::Southbound(format!("{} not found", path)))
    }

    async fn write_resource(&self, session: &SessionHandle, path: &ResourcePath, value: &Value) -> GatewayResult<()> {
        self.calls
            .lock()
            .push(Call::Write(session.endpoint.clone(), path.to_string(), value.clone()));
        if *self.fail_writes.lock() {
            return Err(GatewayError::Southbound("write rejected".into()));
        }
        Ok(())
    }

    async fn execute_resource(
        &self,
        session: &SessionHandle,
        path: &ResourcePath,
        argument: Option<&str>,
    ) -> GatewayResult<()> {
        self.calls.lock().push(Call::Execute(
            session.endpoint.clone(),
            path.to_string(),
            argument.map(str::to_string),
        ));
        Ok(())
    }

    async fn observe_resource(&self, session: &SessionHandle, path: &ResourcePath) -> GatewayResult<()> {
        self.calls
            .lock()
            .push(Call::Observe(session.endpoint.clone(), path.to_string()));
        // Yield so concurrent refreshes get a chance to interleave
        tokio::task::yield_now().await;
        self.active
            .lock()
            .entry(session.endpoint.clone())
            .or_default()
            .push(path.to_string());
        Ok(())
    }

    async fn cancel_all_observations(&self, session: &SessionHandle) -> GatewayResult<usize> {
        self.calls
            .lock()
            .push(Call::CancelAll(session.endpoint.clone()));
        tokio::task::yield_now().await;
        Ok(self
            .active
            .lock()
            .remove(&session.endpoint)
            .map(|v| v.len())
            .unwrap_or(0))
    }
}

// =============================================================================
// Directory, tokens, images, publisher
// =============================================================================

#[derive(Default)]
pub struct FakeDirectory {
    pub documents: Mutex<HashMap<(String, String), Value>>,
}

impl FakeDirectory {
    pub fn insert(&self, tenant: &str, doc: Value) {
        let id = doc["id"].as_str().unwrap_or_default().to_string();
        self.documents.lock().insert((tenant.to_string(), id), doc);
    }
}

#[async_trait]
impl DeviceDirectory for FakeDirectory {
    async fn list_tenants(&self) -> GatewayResult<Vec<String>> {
        let mut tenants: Vec<String> = self.documents.lock().keys().map(|(t, _)| t.clone()).collect();
        tenants.sort();
        tenants.dedup();
        Ok(tenants)
    }

    async fn list_devices(&self, tenant: &str) -> GatewayResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .documents
            .lock()
            .keys()
            .filter(|(t, _)| t == tenant)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn get_device(&self, device_id: &str, tenant: &str) -> GatewayResult<Option<Value>> {
        Ok(self
            .documents
            .lock()
            .get(&(tenant.to_string(), device_id.to_string()))
            .cloned())
    }
}

pub struct FakeTokens;

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn get_token(&self, tenant: &str) -> GatewayResult<String> {
        Ok(format!("token-{}", tenant))
    }
}

#[derive(Default)]
pub struct FakeImages {
    /// (label, version, image id)
    pub images: Mutex<Vec<(String, String, String)>>,
    pub downloads: Mutex<Vec<(String, String)>>,
}

impl FakeImages {
    pub fn add(&self, label: &str, version: &str, id: &str) {
        self.images
            .lock()
            .push((label.to_string(), version.to_string(), id.to_string()));
    }
}

#[async_trait]
impl ImageRepository for FakeImages {
    async fn resolve_image(&self, _tenant: &str, label: &str, version: &str) -> GatewayResult<Option<String>> {
        Ok(self
            .images
            .lock()
            .iter()
            .find(|(l, v, _)| l == label && v == version)
            .map(|(_, _, id)| id.clone()))
    }

    async fn download_image(&self, image_id: &str, token: &str) -> GatewayResult<PathBuf> {
        self.downloads
            .lock()
            .push((image_id.to_string(), token.to_string()));
        Ok(PathBuf::from(format!("/tmp/{}.hex", image_id)))
    }

    fn build_download_uri(&self, image_id: &str, secure: bool) -> String {
        if secure {
            format!("coaps://files.local:5694/data/{}.hex", image_id)
        } else {
            format!("coap://files.local:5693/data/{}.hex", image_id)
        }
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, String, Map<String, Value>)>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<(String, String, Map<String, Value>)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl AttributePublisher for RecordingPublisher {
    async fn publish(
        &self,
        device_id: &str,
        tenant: &str,
        attrs: Map<String, Value>,
        _metadata: Option<Value>,
    ) -> GatewayResult<()> {
        self.published
            .lock()
            .push((device_id.to_string(), tenant.to_string(), attrs));
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub engine: GatewayEngine,
    pub protocol: Arc<FakeProtocol>,
    pub directory: Arc<FakeDirectory>,
    pub images: Arc<FakeImages>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub publisher: Arc<RecordingPublisher>,
}

impl Harness {
    pub fn new() -> Self {
        let protocol = Arc::new(FakeProtocol::default());
        let directory = Arc::new(FakeDirectory::default());
        let images = Arc::new(FakeImages::default());
        let credentials = Arc::new(MemoryCredentialStore::new());
        let publisher = Arc::new(RecordingPublisher::default());

        let engine = GatewayEngine::new(
            Collaborators {
                protocol: protocol.clone(),
                directory: directory.clone(),
                tokens: Arc::new(FakeTokens),
                images: images.clone(),
                credentials: credentials.clone(),
                publisher: publisher.clone(),
            },
            GatewaySettings::default(),
        );

        Self {
            engine,
            protocol,
            directory,
            images,
            credentials,
            publisher,
        }
    }
}

// =============================================================================
// Documents
// =============================================================================

pub const TENANT: &str = "admin";

pub fn endpoint_attr(endpoint: &str) -> Value {
    json!({"label": "client_endpoint", "type": "static", "value_type": "string", "static_value": endpoint})
}

pub fn mapped(label: &str, kind: &str, value_type: &str, path: &str) -> Value {
    json!({
        "label": label,
        "type": kind,
        "value_type": value_type,
        "metadata": [{"label": "path", "type": "lwm2m", "static_value": path}]
    })
}

pub fn firmware(label: &str, suffix: &str) -> Value {
    json!({
        "label": label,
        "type": "dynamic",
        "value_type": "interger",
        "metadata": [{"label": format!("dojot:firmware_update:{}", suffix), "type": "meta", "static_value": ""}]
    })
}

pub fn psk_attrs(key: &str, identity: &str) -> Vec<Value> {
    vec![
        json!({
            "label": "psk", "type": "static", "value_type": "psk", "static_value": key,
            "metadata": [{"label": "path", "static_value": "/0/0/5"}]
        }),
        json!({
            "label": "psk_identity", "type": "static", "value_type": "string", "static_value": identity,
            "metadata": [{"label": "path", "static_value": "/0/0/3"}]
        }),
    ]
}

pub fn document(id: &str, label: &str, endpoint: &str, mut attrs: Vec<Value>) -> Value {
    attrs.insert(0, endpoint_attr(endpoint));
    json!({"id": id, "label": label, "attrs": {"1": attrs}})
}

/// Sensor with a readable temperature, a writable LED and an executable reboot
pub fn sensor(id: &str, endpoint: &str) -> Value {
    document(
        id,
        "sensor",
        endpoint,
        vec![
            mapped("temperature", "dynamic", "float", "/3303/0/5700"),
            mapped("counter", "dynamic", "interger", "/3/0/10"),
            mapped("led", "actuator", "boolean", "/3311/0/5850"),
            json!({
                "label": "reboot", "type": "actuator", "value_type": "string",
                "metadata": [
                    {"label": "path", "static_value": "/3/0/4"},
                    {"label": "operations", "static_value": "e"}
                ]
            }),
            json!({"label": "location", "type": "static", "value_type": "string", "static_value": "lab"}),
        ],
    )
}

pub fn lifecycle(event: &str, data: Value) -> lwgw_core::NorthboundEvent {
    serde_json::from_value(json!({"event": event, "meta": {"service": TENANT}, "data": data}))
        .expect("valid event")
}

pub fn session(registration_id: &str, endpoint: &str) -> SessionHandle {
    SessionHandle::new(registration_id, endpoint)
}
