pub mod client;
pub mod codec;
pub mod command;
pub mod commands;
pub mod config;
pub mod connection;
pub mod convert;
pub mod decoder;
pub mod dispatch;
pub mod encoder;
pub mod endpoint;
pub mod error;
pub mod hash_table;
pub mod list;
pub mod reply;
pub mod request;
pub mod router;
pub mod sequence;
pub mod transport;
pub mod value_codec;

pub use client::Client;
pub use command::{Command, ReadMode, ReplyShape, ValueKind, Verb};
pub use config::ClientConfig;
pub use convert::Object;
pub use error::{ClientError, CodecError, ProtocolError};
pub use hash_table::HashTable;
pub use list::List;
pub use reply::{Reply, ReplyItem, ReplyKind, ReplyStatus, Value};
pub use sequence::Sequence;
pub use value_codec::{BinaryCodec, JsonCodec, ValueCodec};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
