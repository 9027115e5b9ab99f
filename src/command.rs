use std::fmt;

use bytes::{Bytes, BytesMut};
use itertools::Itertools;
use serde::Serialize;
use strum_macros::{EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::encoder;
use crate::error::CodecError;
use crate::value_codec::ValueCodec;

/// Protocol verbs known ahead of time. Their bulk frames are precomputed once per process, see
/// [`encoder::verb_frame`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Verb {
    // Connection and server.
    Auth,
    Dbsize,
    Echo,
    Flushall,
    Flushdb,
    Info,
    Ping,
    Publish,
    Select,

    // Keys.
    Del,
    Dump,
    Exists,
    Expire,
    Expireat,
    Keys,
    Move,
    Persist,
    Pexpire,
    Pexpireat,
    Pttl,
    Randomkey,
    Rename,
    Renamenx,
    Scan,
    Touch,
    Ttl,
    Type,
    Unlink,

    // Strings.
    Append,
    Decr,
    Decrby,
    Get,
    Getbit,
    Getdel,
    Getrange,
    Getset,
    Incr,
    Incrby,
    Incrbyfloat,
    Mget,
    Mset,
    Msetnx,
    Psetex,
    Set,
    Setbit,
    Setex,
    Setnx,
    Setrange,
    Strlen,

    // Hashes.
    Hdel,
    Hexists,
    Hget,
    Hgetall,
    Hincrby,
    Hincrbyfloat,
    Hkeys,
    Hlen,
    Hmget,
    Hmset,
    Hset,
    Hsetnx,
    Hstrlen,
    Hvals,

    // Lists.
    Blpop,
    Brpop,
    Brpoplpush,
    Lindex,
    Linsert,
    Llen,
    Lpop,
    Lpush,
    Lpushx,
    Lrange,
    Lrem,
    Lset,
    Ltrim,
    Rpop,
    Rpoplpush,
    Rpush,
    Rpushx,

    // Sets and sorted sets.
    Sadd,
    Scard,
    Sismember,
    Smembers,
    Srem,
    Zadd,
    Zcard,
    Zincrby,
    Zinterstore,
    Zrange,
    Zrank,
    Zrem,
    Zscore,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Read-only verbs may be served by a read endpoint.
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Verb::Dbsize
                | Verb::Echo
                | Verb::Info
                | Verb::Ping
                | Verb::Dump
                | Verb::Exists
                | Verb::Keys
                | Verb::Pttl
                | Verb::Randomkey
                | Verb::Scan
                | Verb::Ttl
                | Verb::Type
                | Verb::Get
                | Verb::Getbit
                | Verb::Getrange
                | Verb::Mget
                | Verb::Strlen
                | Verb::Hexists
                | Verb::Hget
                | Verb::Hgetall
                | Verb::Hkeys
                | Verb::Hlen
                | Verb::Hmget
                | Verb::Hstrlen
                | Verb::Hvals
                | Verb::Lindex
                | Verb::Llen
                | Verb::Lrange
                | Verb::Scard
                | Verb::Sismember
                | Verb::Smembers
                | Verb::Zcard
                | Verb::Zrange
                | Verb::Zrank
                | Verb::Zscore
        )
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verb of a command: either from the catalog or framed once when the command is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Name {
    Known(Verb),
    Custom { name: String, frame: Bytes },
}

impl Name {
    pub fn as_str(&self) -> &str {
        match self {
            Name::Known(verb) => verb.as_str(),
            Name::Custom { name, .. } => name,
        }
    }
}

/// A plain argument, sent as the bulk string of its text form.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bytes(Bytes),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Bytes(Bytes::from(value))
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::from(value.as_str())
    }
}

impl From<&[u8]> for Scalar {
    fn from(value: &[u8]) -> Self {
        Scalar::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Scalar::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for Scalar {
    fn from(value: Bytes) -> Self {
        Scalar::Bytes(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::UInt(value.into())
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::UInt(value)
    }
}

impl From<usize> for Scalar {
    fn from(value: usize) -> Self {
        Scalar::UInt(value as u64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(value.into())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bytes(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::UInt(u) => write!(f, "{}", u),
            Scalar::Float(x) => write!(f, "{}", x),
        }
    }
}

/// One request argument after the verb.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Scalar(Scalar),
    /// A complete `$<len>\r\n<bytes>\r\n` frame written by a value codec.
    Object(Bytes),
}

/// How the elements of an array reply are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Every element becomes one reply item.
    #[default]
    Standard,
    /// Elements alternate between a key name and a value (`[key, value]` from blocking pops).
    /// Key slots are consumed and dropped; value slots are decoded and kept.
    AlternatingKeyValue,
}

/// The expected representation of a bulk string slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    /// UTF-8 text; non UTF-8 payloads are kept as bytes.
    #[default]
    Text,
    Bytes,
    /// A value codec payload.
    Object,
}

/// The reply shape a caller expects: one value kind per reply slot.
///
/// Slot `i` applies to the `i`-th value of the reply. Slots beyond the declared list reuse the
/// last declared kind, so a single kind covers any number of homogeneous values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyShape {
    kinds: Vec<ValueKind>,
    mode: ReadMode,
}

impl ReplyShape {
    pub fn new(kinds: Vec<ValueKind>) -> Self {
        Self {
            kinds,
            mode: ReadMode::Standard,
        }
    }

    pub fn single(kind: ValueKind) -> Self {
        Self::new(vec![kind])
    }

    pub fn text() -> Self {
        Self::single(ValueKind::Text)
    }

    pub fn object() -> Self {
        Self::single(ValueKind::Object)
    }

    pub fn with_mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub fn kind_at(&self, slot: usize) -> ValueKind {
        self.kinds
            .get(slot)
            .or_else(|| self.kinds.last())
            .copied()
            .unwrap_or_default()
    }
}

/// A request: the verb, whether it may be served by a read endpoint, and its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: Name,
    read_only: bool,
    params: Vec<Parameter>,
    read_mode: ReadMode,
}

impl Command {
    pub fn new(verb: Verb) -> Self {
        Self {
            name: Name::Known(verb),
            read_only: verb.is_read_only(),
            params: Vec::new(),
            read_mode: ReadMode::Standard,
        }
    }

    /// A command outside the verb catalog. Its verb frame is built here, once.
    pub fn custom(name: impl Into<String>, read_only: bool) -> Self {
        let name = name.into().to_uppercase();
        let frame = encoder::frame_verb(&name);
        Self {
            name: Name::Custom { name, frame },
            read_only,
            params: Vec::new(),
            read_mode: ReadMode::Standard,
        }
    }

    pub fn arg(mut self, value: impl Into<Scalar>) -> Self {
        self.params.push(Parameter::Scalar(value.into()));
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        self.params
            .extend(values.into_iter().map(|v| Parameter::Scalar(v.into())));
        self
    }

    /// Adds an application value serialized by `codec`.
    pub fn arg_object<C, T>(mut self, codec: &C, value: &T) -> Result<Self, CodecError>
    where
        C: ValueCodec,
        T: Serialize + ?Sized,
    {
        let mut frame = BytesMut::new();
        codec.serialize(value, &mut frame)?;
        self.params.push(Parameter::Object(frame.freeze()));
        Ok(self)
    }

    pub fn with_read_mode(mut self, mode: ReadMode) -> Self {
        self.read_mode = mode;
        self
    }

    /// Overrides the routing decided by the verb.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    /// Number of bulk strings in the request frame, verb included.
    pub fn arity(&self) -> usize {
        self.params.len() + 1
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .params
            .iter()
            .map(|p| match p {
                Parameter::Scalar(s) => s.to_string(),
                Parameter::Object(frame) => format!("<object {} bytes>", frame.len()),
            })
            .join(" ");
        if args.is_empty() {
            write!(f, "{}", self.name.as_str())
        } else {
            write!(f, "{} {}", self.name.as_str(), args)
        }
    }
}
