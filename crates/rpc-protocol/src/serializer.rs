//! Pluggable payload encode/decode between application values and bytes
//! on the wire.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Raised when a [`Serializer`] fails to encode or decode a payload.
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("failed to encode value: {0}")]
    Encode(String),
    #[error("failed to decode value: {0}")]
    Decode(String),
}

/// Contract for encoding/decoding RPC payloads.
///
/// Argument vectors and single return values both pass through `encode`;
/// the shape of `value` (array vs. scalar) is the caller's concern, not
/// the serializer's. The default [`JsonSerializer`] is the only
/// implementation this crate ships; the trait boundary is what makes the
/// codec pluggable.
pub trait Serializer: Send + Sync {
    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, SerializerError>;
    fn decode_value(&self, bytes: &[u8]) -> Result<Value, SerializerError>;
}

/// JSON-over-UTF-8, the shipped default.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, SerializerError> {
        serde_json::to_vec(value).map_err(|e| SerializerError::Encode(e.to_string()))
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, SerializerError> {
        serde_json::from_slice(bytes).map_err(|e| SerializerError::Decode(e.to_string()))
    }
}

/// Encode a concrete, `Serialize` value through a (possibly trait-object)
/// [`Serializer`]. A free function rather than a trait method, since a
/// generic method would make `Serializer` impossible to use as `dyn
/// Serializer`, which the pluggable-codec contract needs.
pub fn encode_typed<T: Serialize>(serializer: &dyn Serializer, value: &T) -> Result<Vec<u8>, SerializerError> {
    let value = serde_json::to_value(value).map_err(|e| SerializerError::Encode(e.to_string()))?;
    serializer.encode_value(&value)
}

/// Decode `value` into `T`, matching object field names case-insensitively.
///
/// Lower-cases every object key before running the normal
/// typed `Deserialize` so a target struct's field names match regardless of
/// the sender's casing.
pub fn decode_case_insensitive<T: DeserializeOwned>(value: Value) -> Result<T, SerializerError> {
    let normalized = lower_case_keys(value);
    serde_json::from_value(normalized).map_err(|e| SerializerError::Decode(e.to_string()))
}

pub fn lower_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.to_lowercase(), lower_case_keys(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(lower_case_keys).collect()),
        other => other,
    }
}
