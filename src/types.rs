//! Core data types for the telemetry data engine
//!
//! This module contains the fundamental data structures used throughout
//! the crate for representing channel payloads, their declared types, and
//! timestamped records.
//!
//! # Main Types
//!
//! - [`DataType`] - Declared primitive type tag of a data channel
//! - [`StructuredType`] - Descriptor for non-primitive payloads (struct/protobuf/composite)
//! - [`Value`] - A decoded payload value
//! - [`ChannelRecord`] - A single timestamped value
//! - [`ConnectionState`] - Connection state reported by data sources
//!
//! # Wire types
//!
//! Topics are announced with a wire type string (`"double"`, `"boolean[]"`,
//! `"struct:Pose2d"`, ...). [`parse_wire_type`] maps those strings onto a
//! [`DataType`] plus an optional [`StructuredType`]. Unrecognized names are
//! treated as composite sendable type names (e.g. `"Field2d"`, `"Gyro"`),
//! which bind a prefix-subscribed subtree rather than a single topic.
//!
//! # Timestamps
//!
//! Record timestamps are integer microseconds of server time. Records are
//! append-only and ordered by arrival; arrival order and timestamp order can
//! disagree across reconnects, and "latest" always means the insertion-order
//! tail.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Connection state of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected to any server
    #[default]
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected and receiving data
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting..."),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Declared primitive type of a data channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    /// Single boolean
    Boolean,
    /// Single number (integers and floats share one tag)
    #[default]
    Number,
    /// Single string
    #[serde(rename = "string")]
    Str,
    /// Array of booleans
    BooleanArray,
    /// Array of numbers
    NumberArray,
    /// Array of strings
    StringArray,
    /// Raw binary payload
    Binary,
    /// Decoded structured object (struct/protobuf payloads land here)
    Json,
    /// Composite sendable subtree rooted at this channel
    Composite,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Boolean => "boolean",
            DataType::Number => "number",
            DataType::Str => "string",
            DataType::BooleanArray => "booleanArray",
            DataType::NumberArray => "numberArray",
            DataType::StringArray => "stringArray",
            DataType::Binary => "binary",
            DataType::Json => "json",
            DataType::Composite => "composite",
        };
        write!(f, "{}", name)
    }
}

/// Encoding format of a structured payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructFormat {
    /// WPILib packed struct
    Struct,
    /// Protobuf message
    Protobuf,
    /// Composite sendable (a subtree of primitive topics)
    Composite,
}

/// Descriptor used to decode a non-primitive payload and to check
/// widget compatibility
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructuredType {
    /// Encoding format
    pub format: StructFormat,
    /// Type name, e.g. `Pose2d` or `wpi.proto.ProtobufPose2d`
    pub name: String,
}

impl StructuredType {
    /// Create a new descriptor
    pub fn new(format: StructFormat, name: impl Into<String>) -> Self {
        Self {
            format,
            name: name.into(),
        }
    }
}

/// Maps a wire type string onto a data type tag and an optional
/// structured-type descriptor.
///
/// `struct:`/`proto:` payloads arrive pre-decoded from the transport and are
/// stored as [`DataType::Json`] with the descriptor preserved for decoder
/// dispatch. Any other unrecognized name announces a composite sendable.
pub fn parse_wire_type(wire_type: &str) -> (DataType, Option<StructuredType>) {
    match wire_type {
        "boolean" => (DataType::Boolean, None),
        "int" | "float" | "double" => (DataType::Number, None),
        "string" => (DataType::Str, None),
        "boolean[]" => (DataType::BooleanArray, None),
        "int[]" | "float[]" | "double[]" => (DataType::NumberArray, None),
        "string[]" => (DataType::StringArray, None),
        "json" => (DataType::Json, None),
        // Schema descriptors and RPC payloads stay opaque
        "raw" | "rpc" | "msgpack" | "structschema" | "proto:FileDescriptorProto" => {
            (DataType::Binary, None)
        }
        other => {
            if let Some(name) = other.strip_prefix("struct:") {
                (
                    DataType::Json,
                    Some(StructuredType::new(StructFormat::Struct, name)),
                )
            } else if let Some(name) = other.strip_prefix("proto:") {
                (
                    DataType::Json,
                    Some(StructuredType::new(StructFormat::Protobuf, name)),
                )
            } else {
                (
                    DataType::Composite,
                    Some(StructuredType::new(StructFormat::Composite, other)),
                )
            }
        }
    }
}

/// A decoded payload value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Single boolean
    Boolean(bool),
    /// Single number
    Number(f64),
    /// Single string
    Str(String),
    /// Array of booleans
    BooleanArray(Vec<bool>),
    /// Array of numbers
    NumberArray(Vec<f64>),
    /// Array of strings
    StringArray(Vec<String>),
    /// Raw bytes
    Binary(Vec<u8>),
    /// Structured object
    Json(serde_json::Value),
}

impl Value {
    /// Convert a loosely-typed JSON value (as found in recorded session
    /// documents) into a typed payload value.
    ///
    /// Homogeneous arrays collapse into the typed array variants; the
    /// `{"type": "base64", "data": ...}` wrapper decodes into [`Value::Binary`];
    /// everything else stays JSON.
    pub fn from_json(value: serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match value {
            Json::Bool(b) => Value::Boolean(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            Json::String(s) => Value::Str(s),
            Json::Array(items) => {
                if items.iter().all(|v| v.is_boolean()) {
                    Value::BooleanArray(items.iter().filter_map(Json::as_bool).collect())
                } else if items.iter().all(|v| v.is_number()) {
                    Value::NumberArray(items.iter().filter_map(Json::as_f64).collect())
                } else if items.iter().all(|v| v.is_string()) {
                    Value::StringArray(
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_owned))
                            .collect(),
                    )
                } else {
                    Value::Json(Json::Array(items))
                }
            }
            Json::Object(_) => {
                if let Some(bytes) = decode_base64_wrapper(&value) {
                    Value::Binary(bytes)
                } else {
                    Value::Json(value)
                }
            }
            Json::Null => Value::Json(Json::Null),
        }
    }

    /// Convert into the JSON representation used by recorded session
    /// documents. Binary payloads become `{"type": "base64", "data": ...}`.
    pub fn to_replay_json(&self) -> serde_json::Value {
        use serde_json::json;

        match self {
            Value::Boolean(b) => json!(b),
            Value::Number(n) => json!(n),
            Value::Str(s) => json!(s),
            Value::BooleanArray(a) => json!(a),
            Value::NumberArray(a) => json!(a),
            Value::StringArray(a) => json!(a),
            Value::Binary(bytes) => json!({
                "type": "base64",
                "data": BASE64.encode(bytes),
            }),
            Value::Json(v) => v.clone(),
        }
    }

    /// Normalize a freshly-enqueued value.
    ///
    /// A base64 wrapper that survived upstream decoding (the recorded-session
    /// format wraps binary payloads this way) is unwrapped into
    /// [`Value::Binary`] here so downstream consumers never see it.
    pub fn normalized(self) -> Value {
        if let Value::Json(ref v) = self {
            if let Some(bytes) = decode_base64_wrapper(v) {
                return Value::Binary(bytes);
            }
        }
        self
    }

    /// The structured JSON payload, if this value carries one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The numeric payload, if this value carries one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Decode a `{"type": "base64", "data": <string>}` wrapper, if `value` is one.
fn decode_base64_wrapper(value: &serde_json::Value) -> Option<Vec<u8>> {
    let obj = value.as_object()?;
    if obj.get("type")?.as_str()? != "base64" {
        return None;
    }
    let data = obj.get("data")?.as_str()?;
    BASE64.decode(data).ok()
}

/// A single timestamped record in a channel's history
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    /// Server timestamp in integer microseconds
    pub timestamp_micros: i64,
    /// Decoded payload
    pub value: Value,
}

impl ChannelRecord {
    /// Create a new record
    pub fn new(timestamp_micros: i64, value: Value) -> Self {
        Self {
            timestamp_micros,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_primitive_wire_types() {
        assert_eq!(parse_wire_type("boolean"), (DataType::Boolean, None));
        assert_eq!(parse_wire_type("double"), (DataType::Number, None));
        assert_eq!(parse_wire_type("int"), (DataType::Number, None));
        assert_eq!(parse_wire_type("string"), (DataType::Str, None));
        assert_eq!(parse_wire_type("double[]"), (DataType::NumberArray, None));
        assert_eq!(parse_wire_type("boolean[]"), (DataType::BooleanArray, None));
        assert_eq!(parse_wire_type("string[]"), (DataType::StringArray, None));
        assert_eq!(parse_wire_type("raw"), (DataType::Binary, None));
        assert_eq!(parse_wire_type("json"), (DataType::Json, None));
    }

    #[test]
    fn test_parse_struct_wire_type() {
        let (ty, st) = parse_wire_type("struct:Pose2d");
        assert_eq!(ty, DataType::Json);
        assert_eq!(st, Some(StructuredType::new(StructFormat::Struct, "Pose2d")));
    }

    #[test]
    fn test_parse_proto_wire_type() {
        let (ty, st) = parse_wire_type("proto:wpi.proto.ProtobufPose2d");
        assert_eq!(ty, DataType::Json);
        assert_eq!(
            st,
            Some(StructuredType::new(
                StructFormat::Protobuf,
                "wpi.proto.ProtobufPose2d"
            ))
        );
    }

    #[test]
    fn test_parse_composite_wire_type() {
        let (ty, st) = parse_wire_type("Field2d");
        assert_eq!(ty, DataType::Composite);
        assert_eq!(
            st,
            Some(StructuredType::new(StructFormat::Composite, "Field2d"))
        );
    }

    #[test]
    fn test_value_from_json_scalars() {
        assert_eq!(Value::from_json(json!(true)), Value::Boolean(true));
        assert_eq!(Value::from_json(json!(1.5)), Value::Number(1.5));
        assert_eq!(Value::from_json(json!("hi")), Value::Str("hi".into()));
    }

    #[test]
    fn test_value_from_json_arrays() {
        assert_eq!(
            Value::from_json(json!([1, 2, 3])),
            Value::NumberArray(vec![1.0, 2.0, 3.0])
        );
        assert_eq!(
            Value::from_json(json!([true, false])),
            Value::BooleanArray(vec![true, false])
        );
        assert_eq!(
            Value::from_json(json!(["a", "b"])),
            Value::StringArray(vec!["a".into(), "b".into()])
        );
        // Mixed arrays stay JSON
        assert!(matches!(
            Value::from_json(json!([1, "a"])),
            Value::Json(_)
        ));
    }

    #[test]
    fn test_base64_wrapper_round_trip() {
        let original = Value::Binary(vec![0, 1, 2, 254, 255]);
        let encoded = original.to_replay_json();
        assert_eq!(encoded["type"], "base64");
        assert_eq!(Value::from_json(encoded), original);
    }

    #[test]
    fn test_normalized_unwraps_base64() {
        let wrapped = Value::Json(json!({"type": "base64", "data": "AAEC"}));
        assert_eq!(wrapped.normalized(), Value::Binary(vec![0, 1, 2]));

        // Ordinary objects pass through untouched
        let plain = Value::Json(json!({"x": 1.0}));
        assert_eq!(plain.clone().normalized(), plain);
    }
}
