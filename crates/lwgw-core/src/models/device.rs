//! Logical device snapshot built from a device document

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::attribute::AttributeDescriptor;
use crate::error::{DeviceError, GatewayError};
use crate::path::ResourcePath;

/// Label of the static attribute carrying the protocol endpoint name
pub const CLIENT_ENDPOINT_LABEL: &str = "client_endpoint";
/// Resource holding the pre-shared key
pub const PSK_KEY_PATH: &str = "/0/0/5";
/// Resource holding the pre-shared key identity
pub const PSK_IDENTITY_PATH: &str = "/0/0/3";
/// Declared value type required on the key attribute
pub const PSK_VALUE_TYPE: &str = "psk";
/// Declared value type required on the identity attribute
pub const PSK_IDENTITY_VALUE_TYPE: &str = "string";

/// Validated pre-shared-key material declared by a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskPair {
    pub identity: String,
    /// Hex text exactly as declared
    pub key: String,
}

/// Immutable snapshot of one logical device.
///
/// Rebuilt from the directory document on every event that needs it and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub device_id: String,
    /// Device label, used as the image label for firmware resolution
    pub label: String,
    pub tenant: String,
    pub client_endpoint: String,
    attributes: Vec<AttributeDescriptor>,
    #[serde(skip)]
    by_label: HashMap<String, usize>,
    #[serde(skip)]
    by_path: HashMap<String, usize>,
}

impl Device {
    /// Build a device from a logical device document.
    ///
    /// `attrs` may be an object keyed by template id (each value a list of
    /// attributes) or a flat list.
    pub fn from_document(doc: &Value, tenant: &str) -> Result<Self, DeviceError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| DeviceError::Malformed("device document is not an object".into()))?;

        let device_id = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| DeviceError::Malformed("device document has no id".into()))?
            .to_string();
        let label = obj
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut attributes = Vec::new();
        match obj.get("attrs") {
            Some(Value::Object(templates)) => {
                for list in templates.values() {
                    let entries = list.as_array().ok_or_else(|| {
                        DeviceError::Malformed(format!("device {}: template attrs is not a list", device_id))
                    })?;
                    for entry in entries {
                        attributes.push(AttributeDescriptor::from_json(entry)?);
                    }
                }
            }
            Some(Value::Array(entries)) => {
                for entry in entries {
                    attributes.push(AttributeDescriptor::from_json(entry)?);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(DeviceError::Malformed(format!(
                    "device {}: attrs is neither an object nor a list",
                    device_id
                )))
            }
        }

        let client_endpoint = attributes
            .iter()
            .find(|a| a.label == CLIENT_ENDPOINT_LABEL)
            .and_then(|a| a.static_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DeviceError::NotApplicable(format!("device {} has no client endpoint", device_id))
            })?;

        if !attributes.iter().any(|a| a.protocol_mapped) {
            return Err(DeviceError::NotApplicable(format!(
                "device {} has no protocol-mapped attributes",
                device_id
            )));
        }

        let mut by_label = HashMap::new();
        let mut by_path = HashMap::new();
        for (idx, attr) in attributes.iter().enumerate() {
            by_label.entry(attr.label.clone()).or_insert(idx);
            if let Some(path) = &attr.path {
                by_path.entry(path_key(path)).or_insert(idx);
            }
        }

        Ok(Self {
            device_id,
            label,
            tenant: tenant.to_string(),
            client_endpoint,
            attributes,
            by_label,
            by_path,
        })
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn attribute(&self, label: &str) -> Option<&AttributeDescriptor> {
        self.by_label.get(label).map(|&i| &self.attributes[i])
    }

    /// Attribute mapped to a resource path
    pub fn attribute_at(&self, path: &ResourcePath) -> Option<&AttributeDescriptor> {
        self.by_path
            .get(&path.to_string())
            .map(|&i| &self.attributes[i])
    }

    /// Protocol-mapped attributes that may be read (and therefore observed)
    pub fn readable_attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes
            .iter()
            .filter(|a| a.protocol_mapped && a.is_readable())
    }

    /// Validated PSK material, `Ok(None)` when the device declares no key.
    pub fn psk_pair(&self) -> Result<Option<PskPair>, GatewayError> {
        let Some(key_attr) = self.attribute_by_path_text(PSK_KEY_PATH) else {
            return Ok(None);
        };

        if key_attr.value_type != PSK_VALUE_TYPE {
            return Err(self.security(format!(
                "key attribute '{}' has value type '{}', expected '{}'",
                key_attr.label, key_attr.value_type, PSK_VALUE_TYPE
            )));
        }
        let key = key_attr
            .static_str()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| self.security(format!("key attribute '{}' has no value", key_attr.label)))?;

        let id_attr = self
            .attribute_by_path_text(PSK_IDENTITY_PATH)
            .ok_or_else(|| self.security("key declared without an identity attribute".into()))?;
        if id_attr.value_type != PSK_IDENTITY_VALUE_TYPE {
            return Err(self.security(format!(
                "identity attribute '{}' has value type '{}', expected '{}'",
                id_attr.label, id_attr.value_type, PSK_IDENTITY_VALUE_TYPE
            )));
        }
        let identity = id_attr
            .static_str()
            .filter(|i| !i.is_empty())
            .ok_or_else(|| self.security(format!("identity attribute '{}' has no value", id_attr.label)))?;

        Ok(Some(PskPair {
            identity: identity.to_string(),
            key: key.to_string(),
        }))
    }

    /// True when the device declares a valid PSK pair
    pub fn is_secure(&self) -> bool {
        matches!(self.psk_pair(), Ok(Some(_)))
    }

    fn attribute_by_path_text(&self, path: &str) -> Option<&AttributeDescriptor> {
        self.by_path.get(path).map(|&i| &self.attributes[i])
    }

    fn security(&self, reason: String) -> GatewayError {
        GatewayError::Security {
            device_id: self.device_id.clone(),
            reason,
        }
    }
}

/// Normalise declared path text so "3/0/1" and "/3/0/1" index the same slot.
/// Unparseable paths keep their raw text and simply never match a lookup.
fn path_key(path: &str) -> String {
    path.parse::<ResourcePath>()
        .map(|p| p.to_string())
        .unwrap_or_else(|_| path.to_string())
}
