use std::io;

use thiserror::Error as ThisError;

use crate::reply::{Reply, ReplyKind};

/// Wire level failures raised while encoding a request or decoding a reply.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error; invalid reply type byte {0:#04x}")]
    InvalidDataType(u8),
    #[error("protocol error; invalid length header {0:?}")]
    InvalidLength(String),
    #[error("protocol error; invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("protocol error; bulk body is not terminated by CRLF")]
    MissingCrlf,
    #[error("protocol error; empty reply line")]
    EmptyLine,
    #[error("frame size {size} exceeds limit {limit}")]
    FrameTooLarge { size: usize, limit: usize },
    #[error("scalar parameter of {len} bytes exceeds the {limit} byte scratch buffer")]
    ScalarTooLarge { len: usize, limit: usize },
}

impl ProtocolError {
    /// Whether the error came from the transport rather than from the bytes on it.
    pub fn is_io(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }
}

/// Failures of a [`ValueCodec`](crate::value_codec::ValueCodec).
#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary codec error: {0}")]
    Binary(#[from] bincode::Error),
}

/// Error surfaced by the typed client API.
///
/// The low-level execution path never fails; it returns a [`Reply`] whose kind describes the
/// failure. The typed API turns those replies into this error.
#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("{0}")]
    Net(String),
    #[error("{0}")]
    Data(String),
    #[error("{0}")]
    Server(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("unexpected reply; expected {expected}, got {actual:?}")]
    UnexpectedReply {
        expected: &'static str,
        actual: ReplyKind,
    },
}

impl ClientError {
    /// Converts a failed reply into an error carrying its message. Returns `None` when the reply
    /// is not an error.
    pub fn from_reply(reply: &Reply) -> Option<Self> {
        let message = reply.message().unwrap_or_default().to_string();
        match reply.kind() {
            ReplyKind::NetError => Some(ClientError::Net(message)),
            ReplyKind::DataError => Some(ClientError::Data(message)),
            ReplyKind::Error => Some(ClientError::Server(message)),
            _ => None,
        }
    }

    pub(crate) fn unexpected(expected: &'static str, reply: &Reply) -> Self {
        ClientError::UnexpectedReply {
            expected,
            actual: reply.kind(),
        }
    }
}
