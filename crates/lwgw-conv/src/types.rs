//! Wire-level value types
//!
//! A `WireValue` is what the protocol engine hands over for a single
//! resource: the engine's own type tag plus the payload. The tag says how the
//! bytes travelled, not what they mean; meaning comes from the attribute's
//! declared value type (see [`crate::decode`]).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConvError, ConvResult};

/// Resource type tag as reported by the protocol engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireType {
    Boolean,
    Float,
    Integer,
    String,
    Time,
    /// Untyped binary blob
    Opaque,
}

impl std::fmt::Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WireType::Boolean => "boolean",
            WireType::Float => "float",
            WireType::Integer => "integer",
            WireType::String => "string",
            WireType::Time => "time",
            WireType::Opaque => "opaque",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for WireType {
    type Err = ConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "boolean" => Ok(WireType::Boolean),
            "float" => Ok(WireType::Float),
            "integer" => Ok(WireType::Integer),
            "string" => Ok(WireType::String),
            "time" => Ok(WireType::Time),
            "opaque" => Ok(WireType::Opaque),
            other => Err(ConvError::UnsupportedWireType(other.to_string())),
        }
    }
}

/// A single resource value as received from a device
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Boolean(bool),
    Float(f64),
    Integer(i64),
    String(String),
    Time(DateTime<Utc>),
    Opaque(Vec<u8>),
    /// Any tag outside the supported set (objlnk, unsigned, ...)
    Unsupported { tag: String },
}

impl WireValue {
    /// The wire tag, or `None` for unsupported tags
    pub fn wire_type(&self) -> Option<WireType> {
        match self {
            WireValue::Boolean(_) => Some(WireType::Boolean),
            WireValue::Float(_) => Some(WireType::Float),
            WireValue::Integer(_) => Some(WireType::Integer),
            WireValue::String(_) => Some(WireType::String),
            WireValue::Time(_) => Some(WireType::Time),
            WireValue::Opaque(_) => Some(WireType::Opaque),
            WireValue::Unsupported { .. } => None,
        }
    }

    /// Tag name, including unsupported ones
    pub fn tag(&self) -> String {
        match self {
            WireValue::Unsupported { tag } => tag.clone(),
            other => other
                .wire_type()
                .map(|t| t.to_string())
                .unwrap_or_default(),
        }
    }

    /// Plain text rendering, used when a resource is compared as an opaque
    /// string (e.g. firmware versions).
    pub fn as_text(&self) -> String {
        match self {
            WireValue::Boolean(b) => b.to_string(),
            WireValue::Float(f) => f.to_string(),
            WireValue::Integer(i) => i.to_string(),
            WireValue::String(s) => s.clone(),
            WireValue::Time(t) => t.to_rfc3339(),
            WireValue::Opaque(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            WireValue::Unsupported { tag } => format!("<{}>", tag),
        }
    }

    /// Build a value from its tagged JSON form
    pub fn from_tagged(tagged: &TaggedValue) -> ConvResult<Self> {
        let tag = tagged.tag.as_str();
        let value = &tagged.value;

        let wire_type = match tag.parse::<WireType>() {
            Ok(t) => t,
            Err(_) => {
                return Ok(WireValue::Unsupported {
                    tag: tag.to_string(),
                })
            }
        };

        match wire_type {
            WireType::Boolean => value
                .as_bool()
                .map(WireValue::Boolean)
                .ok_or_else(|| ConvError::invalid(tag, "expected a JSON boolean")),
            WireType::Float => value
                .as_f64()
                .map(WireValue::Float)
                .ok_or_else(|| ConvError::invalid(tag, "expected a JSON number")),
            WireType::Integer => value
                .as_i64()
                .map(WireValue::Integer)
                .ok_or_else(|| ConvError::invalid(tag, "expected a signed 64-bit integer")),
            WireType::String => value
                .as_str()
                .map(|s| WireValue::String(s.to_string()))
                .ok_or_else(|| ConvError::invalid(tag, "expected a JSON string")),
            WireType::Time => parse_time(tag, value).map(WireValue::Time),
            WireType::Opaque => {
                let hex_str = value
                    .as_str()
                    .ok_or_else(|| ConvError::invalid(tag, "expected a hex string"))?;
                Ok(WireValue::Opaque(hex::decode(hex_str)?))
            }
        }
    }

    /// Render to the tagged JSON form
    pub fn to_tagged(&self) -> TaggedValue {
        let value = match self {
            WireValue::Boolean(b) => Value::Bool(*b),
            WireValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            WireValue::Integer(i) => Value::from(*i),
            WireValue::String(s) => Value::String(s.clone()),
            WireValue::Time(t) => Value::String(t.to_rfc3339()),
            WireValue::Opaque(bytes) => Value::String(hex::encode(bytes)),
            WireValue::Unsupported { .. } => Value::Null,
        };
        TaggedValue {
            tag: self.tag(),
            value,
        }
    }
}

/// JSON form of a wire value: `{"type": "opaque", "value": "0001"}`
///
/// Opaque payloads travel as hex strings, time as RFC 3339 or epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedValue {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub value: Value,
}

fn parse_time(tag: &str, value: &Value) -> ConvResult<DateTime<Utc>> {
    if let Some(secs) = value.as_i64() {
        return Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| ConvError::invalid(tag, format!("timestamp {} out of range", secs)));
    }
    let s = value
        .as_str()
        .ok_or_else(|| ConvError::invalid(tag, "expected RFC 3339 string or epoch seconds"))?;
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ConvError::invalid(tag, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tagged(tag: &str, value: Value) -> TaggedValue {
        TaggedValue {
            tag: tag.to_string(),
            value,
        }
    }

    #[test]
    fn test_unknown_tag_is_unsupported_not_an_error() {
        let v = WireValue::from_tagged(&tagged("objlnk", json!("3:0"))).unwrap();
        assert_eq!(
            v,
            WireValue::Unsupported {
                tag: "objlnk".to_string()
            }
        );
        assert!(v.wire_type().is_none());
    }

    #[test]
    fn test_opaque_from_hex() {
        let v = WireValue::from_tagged(&tagged("opaque", json!("00ff10"))).unwrap();
        assert_eq!(v, WireValue::Opaque(vec![0x00, 0xFF, 0x10]));
        assert_eq!(v.to_tagged().value, json!("00ff10"));
    }

    #[test]
    fn test_opaque_bad_hex() {
        assert!(WireValue::from_tagged(&tagged("opaque", json!("xyz"))).is_err());
    }

    #[test]
    fn test_time_from_epoch_and_rfc3339() {
        let a = WireValue::from_tagged(&tagged("time", json!(0))).unwrap();
        let b = WireValue::from_tagged(&tagged("time", json!("1970-01-01T00:00:00Z"))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mismatched_payload() {
        assert!(WireValue::from_tagged(&tagged("boolean", json!("yes"))).is_err());
        assert!(WireValue::from_tagged(&tagged("integer", json!(1.5))).is_err());
    }

    #[test]
    fn test_as_text() {
        assert_eq!(WireValue::String("1.0".into()).as_text(), "1.0");
        assert_eq!(WireValue::Opaque(b"1.1".to_vec()).as_text(), "1.1");
        assert_eq!(WireValue::Integer(7).as_text(), "7");
    }
}
