//! Serialization of application values into bulk string payloads.

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encoder;
use crate::error::CodecError;

/// Turns application values into bulk payloads and back.
///
/// Implementations only deal with the payload bytes; [`ValueCodec::serialize`] wraps them into a
/// complete `$<len>\r\n<bytes>\r\n` frame.
pub trait ValueCodec: Clone + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn to_bytes<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized;

    /// Decodes a value from exactly the declared payload bytes.
    fn from_bytes<T>(&self, body: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned;

    /// Writes `value` as a complete bulk frame.
    fn serialize<T>(&self, value: &T, dst: &mut BytesMut) -> Result<(), CodecError>
    where
        T: Serialize + ?Sized,
    {
        let body = self.to_bytes(value)?;
        encoder::write_bulk(dst, &body);
        Ok(())
    }

    fn deserialize<T>(&self, body: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        self.from_bytes(body)
    }
}

/// Textual structured encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn to_bytes<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized,
    {
        Ok(serde_json::to_vec(value)?)
    }

    fn from_bytes<T>(&self, body: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Compact binary encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl ValueCodec for BinaryCodec {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn to_bytes<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized,
    {
        Ok(bincode::serialize(value)?)
    }

    fn from_bytes<T>(&self, body: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        Ok(bincode::deserialize(body)?)
    }
}
