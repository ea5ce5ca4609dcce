//! Codec trait and implementations.
//!
//! This module provides the [`Codec`] trait that wraps a binary serialization
//! library behind two whole-buffer operations:
//! - `decode(bytes) -> Value`, failing with [`DecodeError`]
//! - `encode(&Value) -> bytes`, total for any JSON-representable value
//!
//! [`MsgPackCodec`] is the MessagePack implementation backed by `rmp-serde`.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{DecodeError, EncodeError};

/// Codec trait for transcoding structured values to and from a binary format.
///
/// Values are modelled as [`serde_json::Value`], so everything a JSON
/// handler can produce must round-trip through `encode` then `decode`.
///
/// # Example
///
/// ```ignore
/// use msgpack_axum_core::{Codec, DecodeError, EncodeError};
/// use bytes::Bytes;
/// use serde_json::Value;
///
/// struct CborCodec;
///
/// impl Codec for CborCodec {
///     fn name(&self) -> &'static str { "cbor" }
///
///     fn decode(&self, data: &[u8]) -> Result<Value, DecodeError> {
///         // ... cbor decoding
///     }
///
///     fn encode(&self, value: &Value) -> Result<Bytes, EncodeError> {
///         // ... cbor encoding
///     }
/// }
/// ```
pub trait Codec: Send + Sync + 'static {
    /// Short name for logs (e.g. "msgpack").
    fn name(&self) -> &'static str;

    /// Decode a complete buffer into a structured value.
    fn decode(&self, data: &[u8]) -> Result<Value, DecodeError>;

    /// Encode a structured value into a complete buffer.
    fn encode(&self, value: &Value) -> Result<Bytes, EncodeError>;
}

/// A boxed codec for type-erased storage.
#[derive(Clone)]
pub struct BoxedCodec(Arc<dyn Codec>);

impl BoxedCodec {
    /// Create a new boxed codec.
    pub fn new<C: Codec>(codec: C) -> Self {
        BoxedCodec(Arc::new(codec))
    }

    /// Get the codec name.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decode data.
    pub fn decode(&self, data: &[u8]) -> Result<Value, DecodeError> {
        self.0.decode(data)
    }

    /// Encode a value.
    pub fn encode(&self, value: &Value) -> Result<Bytes, EncodeError> {
        self.0.encode(value)
    }
}

impl Default for BoxedCodec {
    fn default() -> Self {
        Self::new(MsgPackCodec)
    }
}

impl std::fmt::Debug for BoxedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxedCodec").field(&self.name()).finish()
    }
}

/// MessagePack codec using `rmp-serde`.
///
/// Decoding rejects trailing bytes and MessagePack types without a JSON
/// equivalent (bin, ext, non-string map keys).
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn decode(&self, data: &[u8]) -> Result<Value, DecodeError> {
        let mut de = rmp_serde::Deserializer::new(data);
        let value =
            Value::deserialize(&mut de).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let rest = de.into_inner();
        if !rest.is_empty() {
            return Err(DecodeError::TrailingBytes(rest.len()));
        }
        Ok(value)
    }

    fn encode(&self, value: &Value) -> Result<Bytes, EncodeError> {
        rmp_serde::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| EncodeError(e.to_string()))
    }
}
