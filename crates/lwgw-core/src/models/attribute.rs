//! Attribute descriptors parsed from a device's declared schema

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DeviceError;
use crate::path::{PathError, ResourcePath};

/// Metadata label that maps an attribute onto a resource path
pub const PATH_METADATA: &str = "path";
/// Metadata label that overrides the attribute's operations
pub const OPERATIONS_METADATA: &str = "operations";
/// Prefix of the reserved firmware-update metadata labels
pub const FIRMWARE_UPDATE_PREFIX: &str = "dojot:firmware_update";

/// Attribute kind as declared by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Fixed value, no operations
    Static,
    /// Device-readable
    Dynamic,
    /// Device-writable
    Actuator,
    /// Unrecognized type, carried for diagnostics only
    #[serde(untagged)]
    Other(String),
}

impl AttributeKind {
    fn parse(s: &str) -> Self {
        match s {
            "static" => AttributeKind::Static,
            "dynamic" => AttributeKind::Dynamic,
            "actuator" => AttributeKind::Actuator,
            other => AttributeKind::Other(other.to_string()),
        }
    }

    /// Default operations for this kind, before metadata overrides
    pub fn default_operations(&self) -> Operations {
        match self {
            AttributeKind::Static => Operations::None,
            AttributeKind::Dynamic => Operations::Read,
            AttributeKind::Actuator => Operations::ReadWrite,
            AttributeKind::Other(_) => Operations::None,
        }
    }
}

/// Capability set derived from kind and metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operations {
    None,
    Read,
    Write,
    ReadWrite,
    Execute,
}

impl Operations {
    pub fn is_readable(self) -> bool {
        matches!(self, Operations::Read | Operations::ReadWrite)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Operations::Write | Operations::ReadWrite)
    }

    pub fn is_executable(self) -> bool {
        matches!(self, Operations::Execute)
    }
}

/// Reserved firmware-update roles and their fixed object 5 resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirmwareRole {
    State,
    UpdateResult,
    Update,
    DesiredVersion,
}

impl FirmwareRole {
    /// Match a full metadata label (`dojot:firmware_update:<suffix>`)
    pub fn from_metadata_label(label: &str) -> Option<Self> {
        let suffix = label
            .strip_prefix(FIRMWARE_UPDATE_PREFIX)?
            .strip_prefix(':')?;
        match suffix {
            "state" => Some(FirmwareRole::State),
            "update_result" => Some(FirmwareRole::UpdateResult),
            "update" => Some(FirmwareRole::Update),
            "desired_version" => Some(FirmwareRole::DesiredVersion),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            FirmwareRole::State => "/5/0/3",
            FirmwareRole::UpdateResult => "/5/0/5",
            FirmwareRole::Update => "/5/0/2",
            FirmwareRole::DesiredVersion => "/5/0/1",
        }
    }
}

/// A typed attribute of a logical device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Unique-per-device identifier used by the platform
    pub label: String,
    pub kind: AttributeKind,
    /// Declared semantic type ("string", "interger", "boolean", "float", "psk", ...)
    pub value_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_value: Option<Value>,
    /// Declared resource path text, parsed on use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub operations: Operations,
    /// Set when a path was declared or implied; such attributes drive
    /// protocol operations
    pub protocol_mapped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_role: Option<FirmwareRole>,
}

impl AttributeDescriptor {
    /// Parse one attribute entry of a device document
    pub fn from_json(json: &Value) -> Result<Self, DeviceError> {
        let label = required_str(json, "label")?;
        let value_type = required_str(json, "value_type")?;
        let kind = AttributeKind::parse(&required_str(json, "type")?);

        let static_value = match kind {
            AttributeKind::Static => json.get("static_value").filter(|v| !v.is_null()).cloned(),
            _ => None,
        };

        let mut attr = Self {
            operations: kind.default_operations(),
            label,
            kind,
            value_type,
            static_value,
            path: None,
            protocol_mapped: false,
            firmware_role: None,
        };

        let Some(metadata) = json.get("metadata").filter(|m| !m.is_null()) else {
            return Ok(attr);
        };
        let entries = metadata.as_array().ok_or_else(|| {
            DeviceError::Malformed(format!("attribute '{}': metadata is not a list", attr.label))
        })?;

        for entry in entries {
            attr.apply_metadata(entry)?;
        }

        Ok(attr)
    }

    fn apply_metadata(&mut self, entry: &Value) -> Result<(), DeviceError> {
        let meta_label = required_str(entry, "label")?;

        if meta_label.starts_with(FIRMWARE_UPDATE_PREFIX) {
            match FirmwareRole::from_metadata_label(&meta_label) {
                Some(role) => {
                    self.path = Some(role.path().to_string());
                    self.protocol_mapped = true;
                    self.firmware_role = Some(role);
                    if role == FirmwareRole::Update {
                        self.operations = Operations::Execute;
                    }
                }
                None => {
                    tracing::debug!(label = %self.label, metadata = %meta_label, "Unknown firmware update metadata");
                }
            }
        }

        if meta_label == PATH_METADATA {
            self.path = Some(required_str_field(entry, "static_value", &self.label)?);
            self.protocol_mapped = true;
        } else if meta_label == OPERATIONS_METADATA
            && required_str_field(entry, "static_value", &self.label)? == "e"
        {
            self.operations = Operations::Execute;
        }

        Ok(())
    }

    pub fn is_readable(&self) -> bool {
        self.operations.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.operations.is_writable()
    }

    pub fn is_executable(&self) -> bool {
        self.operations.is_executable()
    }

    /// Parse the declared path; `Ok(None)` for platform-only attributes
    pub fn resource_path(&self) -> Result<Option<ResourcePath>, PathError> {
        self.path.as_deref().map(str::parse).transpose()
    }

    /// Static value as a string, if it is one
    pub fn static_str(&self) -> Option<&str> {
        self.static_value.as_ref().and_then(Value::as_str)
    }
}

fn required_str(json: &Value, field: &str) -> Result<String, DeviceError> {
    json.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DeviceError::Malformed(format!("missing or non-string field '{}'", field)))
}

fn required_str_field(json: &Value, field: &str, attr: &str) -> Result<String, DeviceError> {
    required_str(json, field)
        .map_err(|_| DeviceError::Malformed(format!("attribute '{}': metadata '{}' is not a string", attr, field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attr(json: Value) -> AttributeDescriptor {
        AttributeDescriptor::from_json(&json).unwrap()
    }

    #[test]
    fn test_kind_operations_table() {
        let cases = [
            ("static", false, false, false),
            ("dynamic", true, false, false),
            ("actuator", true, true, false),
            ("meta", false, false, false),
        ];
        for (kind, r, w, e) in cases {
            let a = attr(json!({"label": "x", "type": kind, "value_type": "string"}));
            assert_eq!(a.is_readable(), r, "readable for {}", kind);
            assert_eq!(a.is_writable(), w, "writable for {}", kind);
            assert_eq!(a.is_executable(), e, "executable for {}", kind);
            assert!(!a.protocol_mapped);
        }
    }

    #[test]
    fn test_path_metadata_maps_attribute() {
        let a = attr(json!({
            "label": "temperature",
            "type": "dynamic",
            "value_type": "float",
            "metadata": [{"label": "path", "type": "lwm2m", "static_value": "/3303/0/5700"}]
        }));
        assert!(a.protocol_mapped);
        assert_eq!(a.path.as_deref(), Some("/3303/0/5700"));
        assert_eq!(
            a.resource_path().unwrap(),
            Some(ResourcePath::new(&[3303, 0, 5700]))
        );
        assert!(a.is_readable());
    }

    #[test]
    fn test_operations_execute_override() {
        let a = attr(json!({
            "label": "reboot",
            "type": "actuator",
            "value_type": "string",
            "metadata": [
                {"label": "path", "static_value": "/3/0/4"},
                {"label": "operations", "static_value": "e"}
            ]
        }));
        assert!(a.is_executable());
        assert!(!a.is_writable());
        assert!(!a.is_readable());
    }

    #[test]
    fn test_operations_non_execute_value_keeps_default() {
        let a = attr(json!({
            "label": "led",
            "type": "actuator",
            "value_type": "boolean",
            "metadata": [{"label": "operations", "static_value": "rw"}]
        }));
        assert_eq!(a.operations, Operations::ReadWrite);
    }

    #[test]
    fn test_firmware_roles() {
        let cases = [
            ("state", "/5/0/3", Operations::Read),
            ("update_result", "/5/0/5", Operations::Read),
            ("update", "/5/0/2", Operations::Execute),
            ("desired_version", "/5/0/1", Operations::Read),
        ];
        for (suffix, path, ops) in cases {
            let a = attr(json!({
                "label": format!("fw_{}", suffix),
                "type": "dynamic",
                "value_type": "string",
                "metadata": [{"label": format!("dojot:firmware_update:{}", suffix), "static_value": ""}]
            }));
            assert!(a.protocol_mapped, "{}", suffix);
            assert_eq!(a.path.as_deref(), Some(path), "{}", suffix);
            assert_eq!(a.operations, ops, "{}", suffix);
        }
    }

    #[test]
    fn test_unknown_firmware_suffix_is_ignored() {
        let a = attr(json!({
            "label": "fw_other",
            "type": "dynamic",
            "value_type": "string",
            "metadata": [{"label": "dojot:firmware_update:package", "static_value": ""}]
        }));
        assert!(!a.protocol_mapped);
        assert_eq!(a.path, None);
    }

    #[test]
    fn test_static_value_kept_only_for_static() {
        let a = attr(json!({"label": "k", "type": "static", "value_type": "psk", "static_value": "00ff"}));
        assert_eq!(a.static_str(), Some("00ff"));
        let b = attr(json!({"label": "k", "type": "dynamic", "value_type": "psk", "static_value": "00ff"}));
        assert_eq!(b.static_value, None);
    }

    #[test]
    fn test_missing_required_fields() {
        for missing in ["label", "type", "value_type"] {
            let mut doc = json!({"label": "x", "type": "dynamic", "value_type": "string"});
            doc.as_object_mut().unwrap().remove(missing);
            assert!(matches!(
                AttributeDescriptor::from_json(&doc),
                Err(DeviceError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_malformed_path_fails_only_on_use() {
        let a = attr(json!({
            "label": "bad",
            "type": "dynamic",
            "value_type": "string",
            "metadata": [{"label": "path", "static_value": "/3/x/1"}]
        }));
        assert!(a.protocol_mapped);
        assert!(a.resource_path().is_err());
    }
}
