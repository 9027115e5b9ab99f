use serde::Serialize;

use crate::command::{Command, Verb};
use crate::error::CodecError;
use crate::value_codec::ValueCodec;

pub fn ping() -> Command {
    Command::new(Verb::Ping)
}

pub fn echo(message: &str) -> Command {
    Command::new(Verb::Echo).arg(message)
}

pub fn select(db: u32) -> Command {
    Command::new(Verb::Select).arg(db)
}

pub fn flushall() -> Command {
    Command::new(Verb::Flushall)
}

pub fn flushdb() -> Command {
    Command::new(Verb::Flushdb)
}

pub fn dbsize() -> Command {
    Command::new(Verb::Dbsize)
}

pub fn info(section: Option<&str>) -> Command {
    let command = Command::new(Verb::Info);
    match section {
        Some(section) => command.arg(section),
        None => command,
    }
}

pub fn auth(password: &str) -> Command {
    Command::new(Verb::Auth).arg(password)
}

/// Publishes a value serialized by `codec`. Subscribing is out of scope for this client.
pub fn publish<C, T>(codec: &C, channel: &str, message: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Publish)
        .arg(channel)
        .arg_object(codec, message)
}
