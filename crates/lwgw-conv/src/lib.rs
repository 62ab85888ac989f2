//! lwgw-conv - Resource value decoding for the LwM2M gateway
//!
//! Converts single-resource values reported by devices into the platform's
//! generic JSON attribute values.
//!
//! Typed values (boolean, float, integer, string, time) map directly.
//! Opaque payloads carry no type of their own, so the attribute's declared
//! value type picks the rule:
//!
//! | Declared type | Rule                                         |
//! |---------------|----------------------------------------------|
//! | `interger`    | big-endian signed integer, 1/2/4/8 bytes     |
//! | `boolean`     | exactly 1 byte, `1` is true                  |
//! | `float`       | IEEE 754 big-endian, 4 or 8 bytes            |
//! | anything else | bytes as text                                |
//!
//! # Quick Start
//!
//! ```rust
//! use lwgw_conv::{decode, WireValue};
//! use serde_json::json;
//!
//! let value = decode(&WireValue::Opaque(vec![0x01, 0x00]), "interger").unwrap();
//! assert_eq!(value, json!(256));
//! ```

pub mod decode;
pub mod error;
pub mod types;

pub use decode::{decode, decode_opaque, BOOLEAN_VALUE_TYPE, FLOAT_VALUE_TYPE, INTEGER_VALUE_TYPE};
pub use error::{ConvError, ConvResult};
pub use types::{TaggedValue, WireType, WireValue};
