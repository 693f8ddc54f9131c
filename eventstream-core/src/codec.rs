//! Message codec trait and implementations.
//!
//! A [`MessageCodec`] turns typed messages into record payloads and back.
//! Codecs must be deterministic and side-effect free; failures are reported
//! as [`CodecError`] values, never as silent corruption.
//!
//! Provided implementations:
//! - [`JsonCodec`]: JSON via serde
//! - [`ProtoCodec`]: protobuf via prost
//! - [`StringCodec`]: plain UTF-8 text

use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use prost::Message;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// Codec contract for one message direction.
///
/// A client uses two codec instances: one for the `Send` type and one for
/// the `Receive` type. They need not use the same serialization format.
///
/// # Example
///
/// ```ignore
/// struct HexCodec;
///
/// impl MessageCodec<Vec<u8>> for HexCodec {
///     fn media_type(&self) -> &'static str { "application/x-hex" }
///
///     fn encode(&self, message: &Vec<u8>) -> Result<Bytes, CodecError> {
///         // ... hex encoding
///     }
///
///     fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
///         // ... hex decoding
///     }
/// }
/// ```
pub trait MessageCodec<T>: Send + Sync + 'static {
    /// The media type for HTTP `Content-Type`/`Accept` headers.
    fn media_type(&self) -> &'static str;

    /// Encode a message into a record payload.
    fn encode(&self, message: &T) -> Result<Bytes, CodecError>;

    /// Decode a record payload into a message.
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// A shared, type-erased codec handle.
pub type SharedCodec<T> = Arc<dyn MessageCodec<T>>;

impl<T, C: MessageCodec<T> + ?Sized> MessageCodec<T> for Arc<C> {
    fn media_type(&self) -> &'static str {
        (**self).media_type()
    }

    fn encode(&self, message: &T) -> Result<Bytes, CodecError> {
        (**self).encode(message)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        (**self).decode(bytes)
    }
}

/// JSON codec backed by serde.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Create a new JSON codec.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCodec").finish()
    }
}

impl<T> MessageCodec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn media_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, message: &T) -> Result<Bytes, CodecError> {
        serde_json::to_vec(message)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(format!("JSON encoding failed: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CodecError::Decode(format!("JSON decoding failed: {e}")))
    }
}

/// Protobuf codec backed by prost.
pub struct ProtoCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ProtoCodec<T> {
    /// Create a new protobuf codec.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ProtoCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ProtoCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ProtoCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtoCodec").finish()
    }
}

impl<T> MessageCodec<T> for ProtoCodec<T>
where
    T: Message + Default + 'static,
{
    fn media_type(&self) -> &'static str {
        "application/x-protobuf"
    }

    fn encode(&self, message: &T) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(message.encode_to_vec()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        T::decode(bytes).map_err(|e| CodecError::Decode(format!("protobuf decoding failed: {e}")))
    }
}

/// Plain UTF-8 string codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringCodec;

impl MessageCodec<String> for StringCodec {
    fn media_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn encode(&self, message: &String) -> Result<Bytes, CodecError> {
        Ok(Bytes::copy_from_slice(message.as_bytes()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| CodecError::Decode(format!("invalid UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct TestMessage {
        value: String,
    }

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec::<TestMessage>::new();
        assert_eq!(codec.media_type(), "application/json");

        let original = TestMessage {
            value: "hello".into(),
        };
        let encoded = codec.encode(&original).unwrap();
        assert_eq!(&encoded[..], br#"{"value":"hello"}"#);

        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_json_codec_decode_failure() {
        let codec = JsonCodec::<TestMessage>::new();
        let err = codec.decode(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_string_codec_round_trip() {
        let codec = StringCodec;
        let encoded = codec.encode(&"hello".to_string()).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), "hello");
    }

    #[test]
    fn test_string_codec_rejects_invalid_utf8() {
        let codec = StringCodec;
        assert!(matches!(
            codec.decode(&[0xff, 0xfe]),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_shared_codec_delegates() {
        let codec: SharedCodec<String> = Arc::new(StringCodec);
        assert_eq!(codec.media_type(), "text/plain; charset=utf-8");
        let encoded = codec.encode(&"shared".to_string()).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), "shared");
    }
}
