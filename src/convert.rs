//! Conversion of reply values into Rust types.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::command::ValueKind;
use crate::error::ClientError;
use crate::reply::{ReplyItem, ReplyKind, Value};
use crate::value_codec::ValueCodec;

/// A value decoded through the client's value codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object<T>(pub T);

impl<T> Object<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// A type one reply slot can be read into.
pub trait FromValue: Sized {
    /// How the slot is decoded on the wire.
    const KIND: ValueKind;

    /// `Ok(None)` for a null slot.
    fn from_value<C: ValueCodec>(codec: &C, value: Value) -> Result<Option<Self>, ClientError>;
}

fn mismatch(expected: &'static str, value: &Value) -> ClientError {
    let actual = match value {
        Value::Null => ReplyKind::Null,
        Value::Integer(_) => ReplyKind::Integer,
        Value::Text(_) => ReplyKind::String,
        Value::Bytes(_) => ReplyKind::Bulk,
        Value::Object(_) => ReplyKind::Object,
        Value::Array(_) => ReplyKind::Array,
    };
    ClientError::UnexpectedReply { expected, actual }
}

impl FromValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value<C: ValueCodec>(_: &C, value: Value) -> Result<Option<Self>, ClientError> {
        match value {
            Value::Null => Ok(None),
            Value::Text(text) => Ok(Some(text)),
            Value::Integer(i) => Ok(Some(i.to_string())),
            value => match value.as_str() {
                Some(text) => Ok(Some(text.to_string())),
                None => Err(mismatch("text", &value)),
            },
        }
    }
}

impl FromValue for Bytes {
    const KIND: ValueKind = ValueKind::Bytes;

    fn from_value<C: ValueCodec>(_: &C, value: Value) -> Result<Option<Self>, ClientError> {
        match value {
            Value::Null => Ok(None),
            Value::Bytes(bytes) | Value::Object(bytes) => Ok(Some(bytes)),
            Value::Text(text) => Ok(Some(Bytes::from(text))),
            value => Err(mismatch("bytes", &value)),
        }
    }
}

impl FromValue for i64 {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value<C: ValueCodec>(_: &C, value: Value) -> Result<Option<Self>, ClientError> {
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_integer()
            .map(Some)
            .ok_or_else(|| mismatch("integer", &value))
    }
}

impl FromValue for f64 {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value<C: ValueCodec>(_: &C, value: Value) -> Result<Option<Self>, ClientError> {
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_float()
            .map(Some)
            .ok_or_else(|| mismatch("float", &value))
    }
}

impl<T: DeserializeOwned> FromValue for Object<T> {
    const KIND: ValueKind = ValueKind::Object;

    fn from_value<C: ValueCodec>(codec: &C, value: Value) -> Result<Option<Self>, ClientError> {
        decode_object(codec, value).map(|value| value.map(Object))
    }
}

/// Decodes a codec payload. Text and byte payloads are accepted too.
pub fn decode_object<C, T>(codec: &C, value: Value) -> Result<Option<T>, ClientError>
where
    C: ValueCodec,
    T: DeserializeOwned,
{
    match value {
        Value::Null => Ok(None),
        Value::Object(body) | Value::Bytes(body) => Ok(Some(codec.deserialize(&body)?)),
        Value::Text(text) => Ok(Some(codec.deserialize(text.as_bytes())?)),
        value => Err(mismatch("object", &value)),
    }
}

/// A fixed group of slots read from one array reply, each slot with its own type.
pub trait FromValues: Sized {
    fn kinds() -> Vec<ValueKind>;

    fn from_items<C: ValueCodec>(codec: &C, items: Vec<ReplyItem>) -> Result<Self, ClientError>;
}

macro_rules! impl_from_values {
    ($len:expr; $($name:ident),+) => {
        impl<$($name: FromValue),+> FromValues for ($(Option<$name>,)+) {
            fn kinds() -> Vec<ValueKind> {
                vec![$($name::KIND),+]
            }

            fn from_items<C: ValueCodec>(
                codec: &C,
                items: Vec<ReplyItem>,
            ) -> Result<Self, ClientError> {
                if items.len() != $len {
                    return Err(ClientError::Data(format!(
                        "expected {} values, got {}",
                        $len,
                        items.len()
                    )));
                }
                let mut items = items.into_iter();
                Ok(($(
                    match items.next() {
                        Some(item) => $name::from_value(codec, item.value)?,
                        None => None,
                    },
                )+))
            }
        }
    };
}

impl_from_values!(2; A, B);
impl_from_values!(3; A, B, C2);
impl_from_values!(4; A, B, C2, D);
impl_from_values!(5; A, B, C2, D, E);
