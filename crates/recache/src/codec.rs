//! Pluggable value encoding.
//!
//! The facade moves opaque bytes; a [`Codec`] decides how a typed value maps
//! onto them. [`JsonCodec`] is the default. [`MsgPackCodec`] trades
//! readability for compactness, which matters when entries are large or the
//! store is remote.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// Round-trips values of `T` to bytes. `decode(encode(v))` must equal `v`
/// for every value the generator can produce.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON encoding via `serde_json`. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::new)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::new)
    }
}

/// MessagePack encoding via `rmp-serde` for compact binary entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl<T> Codec<T> for MsgPackCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec(value).map_err(CodecError::new)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::new)
    }
}
