//! Northbound events and southbound notification content

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use lwgw_conv::WireValue;

use crate::error::GatewayError;

/// Northbound lifecycle and command event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Update,
    Remove,
    Configure,
}

/// Event envelope metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Tenant the event belongs to
    pub service: String,
}

/// Message consumed from the northbound lifecycle/command channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NorthboundEvent {
    pub event: EventKind,
    pub meta: EventMeta,
    /// Device document for lifecycle events, [`CommandPayload`] for configure
    pub data: Value,
}

impl NorthboundEvent {
    pub fn tenant(&self) -> &str {
        &self.meta.service
    }
}

/// Body of a configure event: `{id, attrs: {label: value}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub id: String,
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

impl CommandPayload {
    pub fn from_value(data: &Value) -> Result<Self, GatewayError> {
        serde_json::from_value(data.clone())
            .map_err(|e| GatewayError::Malformed(format!("invalid command payload: {}", e)))
    }
}

/// Content carried by an observation response
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceContent {
    /// A single resource value
    Single(WireValue),
    /// Object, instance or multi-instance resource node
    Multiple,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_envelope() {
        let ev: NorthboundEvent = serde_json::from_value(json!({
            "event": "configure",
            "meta": {"service": "admin"},
            "data": {"id": "a1", "attrs": {"led": true}}
        }))
        .unwrap();
        assert_eq!(ev.event, EventKind::Configure);
        assert_eq!(ev.tenant(), "admin");

        let cmd = CommandPayload::from_value(&ev.data).unwrap();
        assert_eq!(cmd.id, "a1");
        assert_eq!(cmd.attrs.get("led"), Some(&json!(true)));
    }

    #[test]
    fn test_unknown_event_kind_rejected() {
        let result: Result<NorthboundEvent, _> = serde_json::from_value(json!({
            "event": "template.create",
            "meta": {"service": "admin"},
            "data": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_command_without_id() {
        assert!(matches!(
            CommandPayload::from_value(&json!({"attrs": {}})),
            Err(GatewayError::Malformed(_))
        ));
    }
}
