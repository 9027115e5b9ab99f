use std::fmt;
use std::str;

use bytes::Bytes;

/// Progress of a reply while its request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyStatus {
    #[default]
    None,
    Loading,
    Completed,
}

/// Classification of a decoded reply, or of one element inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// `+OK` style status line.
    Simple,
    /// `-ERR ...` line sent by the server.
    Error,
    Integer,
    /// Bulk string kept as raw bytes.
    Bulk,
    Array,
    /// Bulk string holding a value codec payload.
    Object,
    /// Bulk string decoded as UTF-8 text.
    String,
    Null,
    NotFound,
    /// No endpoint, failed connect, or the transport closed mid-reply.
    NetError,
    /// Pool exhaustion or a malformed reply.
    DataError,
}

impl ReplyKind {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            ReplyKind::Error | ReplyKind::DataError | ReplyKind::NetError
        )
    }
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Bytes(Bytes),
    /// Raw payload to be decoded by a value codec.
    Object(Bytes),
    Array(Vec<ReplyItem>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Bytes(bytes) | Value::Object(bytes) => str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(text) => Some(text.as_bytes()),
            Value::Bytes(bytes) | Value::Object(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Integer replies, or text that parses as one (`INCRBYFLOAT` and friends reply with bulks).
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            value => value.as_str().and_then(|s| s.parse().ok()),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            value => value.as_str().and_then(|s| s.parse().ok()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "(nil)"),
            Value::Integer(i) => write!(f, "(integer) {}", i),
            Value::Text(text) => write!(f, "\"{}\"", text),
            Value::Bytes(bytes) | Value::Object(bytes) => {
                write!(f, "\"{}\"", String::from_utf8_lossy(bytes))
            }
            Value::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item.value)?;
                }
                Ok(())
            }
        }
    }
}

/// One element of an array reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyItem {
    pub kind: ReplyKind,
    pub value: Value,
}

impl ReplyItem {
    pub fn new(kind: ReplyKind, value: Value) -> Self {
        Self { kind, value }
    }

    pub fn null() -> Self {
        Self::new(ReplyKind::Null, Value::Null)
    }
}

impl fmt::Display for ReplyItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.value)
    }
}

/// Accumulator for one decoded reply.
///
/// Created per request and filled in by the decoder while the request is in flight. Once the
/// status reaches [`ReplyStatus::Completed`] it is handed to the caller and never mutated again.
///
/// Scalar replies land either in `message` (simple strings, errors) or as a single item in
/// `data` (integers, bulks). Array replies append one item per element, in reply order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    status: ReplyStatus,
    kind: Option<ReplyKind>,
    message: Option<String>,
    data: Vec<ReplyItem>,

    /// Declared element count of the top level array.
    pub(crate) array_count: usize,
    /// Top level elements consumed so far.
    pub(crate) array_read_count: usize,
    /// Scalars consumed so far; its parity separates key slots from value slots in
    /// alternating key/value replies.
    pub(crate) read_count: usize,
    /// Declared length of the bulk being read. `-1` is a null bulk.
    pub(crate) body_length: Option<i64>,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simple(message: impl Into<String>) -> Self {
        Self::completed(ReplyKind::Simple, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::completed(ReplyKind::Error, message)
    }

    pub fn net_error(message: impl Into<String>) -> Self {
        Self::completed(ReplyKind::NetError, message)
    }

    pub fn data_error(message: impl Into<String>) -> Self {
        Self::completed(ReplyKind::DataError, message)
    }

    fn completed(kind: ReplyKind, message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Completed,
            kind: Some(kind),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn status(&self) -> ReplyStatus {
        self.status
    }

    /// Kind of the reply. A reply that has not been classified yet reports `Null`.
    pub fn kind(&self) -> ReplyKind {
        self.kind.unwrap_or(ReplyKind::Null)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn data(&self) -> &[ReplyItem] {
        &self.data
    }

    pub fn into_data(self) -> Vec<ReplyItem> {
        self.data
    }

    pub fn is_error(&self) -> bool {
        self.kind().is_error()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind(), ReplyKind::Null | ReplyKind::NotFound)
    }

    /// The single result of the reply: the first data item, falling back to the message.
    pub fn value(&self) -> Option<Value> {
        self.data
            .first()
            .map(|item| item.value.clone())
            .or_else(|| self.message.clone().map(Value::Text))
    }

    pub fn into_value(self) -> Option<Value> {
        let Reply { data, message, .. } = self;
        data.into_iter()
            .next()
            .map(|item| item.value)
            .or_else(|| message.map(Value::Text))
    }

    pub(crate) fn begin(&mut self) {
        *self = Reply {
            status: ReplyStatus::Loading,
            ..Reply::default()
        };
    }

    pub(crate) fn classify(&mut self, kind: ReplyKind) {
        self.kind = Some(kind);
    }

    pub(crate) fn set_message(&mut self, message: String) {
        self.message = Some(message);
    }

    pub(crate) fn push(&mut self, item: ReplyItem) {
        self.data.push(item);
    }

    pub(crate) fn complete(&mut self) {
        self.status = ReplyStatus::Completed;
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ReplyKind::Error | ReplyKind::NetError | ReplyKind::DataError => {
                write!(f, "(error) {}", self.message().unwrap_or_default())
            }
            ReplyKind::Simple => write!(f, "{}", self.message().unwrap_or_default()),
            ReplyKind::Null | ReplyKind::NotFound => write!(f, "(nil)"),
            ReplyKind::Array => write!(f, "{}", Value::Array(self.data.clone())),
            _ => match self.value() {
                Some(value) => write!(f, "{}", value),
                None => write!(f, "(nil)"),
            },
        }
    }
}
