//! Decoding wire values to generic attribute values
//!
//! Typed wire values map directly. Opaque payloads are interpreted according
//! to the attribute's declared value type, which is the only authority on
//! what the bytes mean.

use serde_json::{json, Value};

use crate::error::{ConvError, ConvResult};
use crate::types::WireValue;

/// Declared value type for integers.
///
/// The platform's schema uses this exact (misspelled) token; it must not be
/// corrected or devices declaring it stop decoding.
pub const INTEGER_VALUE_TYPE: &str = "interger";
/// Declared value type for booleans
pub const BOOLEAN_VALUE_TYPE: &str = "boolean";
/// Declared value type for floating point values
pub const FLOAT_VALUE_TYPE: &str = "float";

/// Decode a wire value using the attribute's declared value type
pub fn decode(value: &WireValue, declared_type: &str) -> ConvResult<Value> {
    match value {
        WireValue::Boolean(b) => Ok(json!(b)),
        WireValue::Float(f) => float_value(*f),
        WireValue::Integer(i) => Ok(json!(i)),
        WireValue::String(s) => Ok(json!(s)),
        WireValue::Time(t) => Ok(json!(t.to_rfc3339())),
        WireValue::Opaque(data) => decode_opaque(data, declared_type),
        WireValue::Unsupported { tag } => Err(ConvError::UnsupportedWireType(tag.clone())),
    }
}

/// Decode an opaque payload according to the declared value type
pub fn decode_opaque(data: &[u8], declared_type: &str) -> ConvResult<Value> {
    match declared_type {
        INTEGER_VALUE_TYPE => decode_integer(data),
        BOOLEAN_VALUE_TYPE => decode_boolean(data),
        FLOAT_VALUE_TYPE => decode_float(data),
        // Everything else is treated as text
        _ => Ok(json!(String::from_utf8_lossy(data))),
    }
}

/// Big-endian signed integer of width 1, 2, 4 or 8
fn decode_integer(data: &[u8]) -> ConvResult<Value> {
    let value = match data.len() {
        1 => i64::from(data[0] as i8),
        2 => i64::from(i16::from_be_bytes([data[0], data[1]])),
        4 => i64::from(i32::from_be_bytes([data[0], data[1], data[2], data[3]])),
        8 => i64::from_be_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]),
        n => return Err(width_error(INTEGER_VALUE_TYPE, n)),
    };
    Ok(json!(value))
}

fn decode_boolean(data: &[u8]) -> ConvResult<Value> {
    match data {
        [b] => Ok(json!(*b == 1)),
        _ => Err(width_error(BOOLEAN_VALUE_TYPE, data.len())),
    }
}

/// IEEE 754 single (4 bytes) or double (8 bytes), big-endian
fn decode_float(data: &[u8]) -> ConvResult<Value> {
    let value = match data.len() {
        4 => f64::from(f32::from_be_bytes([data[0], data[1], data[2], data[3]])),
        8 => f64::from_be_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]),
        n => return Err(width_error(FLOAT_VALUE_TYPE, n)),
    };
    float_value(value)
}

fn float_value(value: f64) -> ConvResult<Value> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or(ConvError::NotRepresentable(value))
}

fn width_error(declared: &str, actual: usize) -> ConvError {
    ConvError::InvalidWidth {
        declared: declared.to_string(),
        actual,
    }
}
