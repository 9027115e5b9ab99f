use serde::Serialize;

use crate::command::{Command, Verb};
use crate::error::CodecError;
use crate::value_codec::ValueCodec;

pub fn hset<C, T>(codec: &C, key: &str, fields: &[(&str, T)]) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    let mut command = Command::new(Verb::Hset).arg(key);
    for (field, value) in fields {
        command = command.arg(*field).arg_object(codec, value)?;
    }
    Ok(command)
}

/// `HMSET`, kept for servers older than 4.0 where `HSET` takes a single field.
pub fn hmset<C, T>(codec: &C, key: &str, fields: &[(&str, T)]) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    let mut command = Command::new(Verb::Hmset).arg(key);
    for (field, value) in fields {
        command = command.arg(*field).arg_object(codec, value)?;
    }
    Ok(command)
}

pub fn hsetnx<C, T>(codec: &C, key: &str, field: &str, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Hsetnx)
        .arg(key)
        .arg(field)
        .arg_object(codec, value)
}

pub fn hget(key: &str, field: &str) -> Command {
    Command::new(Verb::Hget).arg(key).arg(field)
}

pub fn hmget(key: &str, fields: &[&str]) -> Command {
    Command::new(Verb::Hmget)
        .arg(key)
        .args(fields.iter().copied())
}

pub fn hdel(key: &str, fields: &[&str]) -> Command {
    Command::new(Verb::Hdel)
        .arg(key)
        .args(fields.iter().copied())
}

pub fn hexists(key: &str, field: &str) -> Command {
    Command::new(Verb::Hexists).arg(key).arg(field)
}

pub fn hlen(key: &str) -> Command {
    Command::new(Verb::Hlen).arg(key)
}

pub fn hstrlen(key: &str, field: &str) -> Command {
    Command::new(Verb::Hstrlen).arg(key).arg(field)
}

pub fn hkeys(key: &str) -> Command {
    Command::new(Verb::Hkeys).arg(key)
}

pub fn hvals(key: &str) -> Command {
    Command::new(Verb::Hvals).arg(key)
}

pub fn hgetall(key: &str) -> Command {
    Command::new(Verb::Hgetall).arg(key)
}

pub fn hincrby(key: &str, field: &str, increment: i64) -> Command {
    Command::new(Verb::Hincrby)
        .arg(key)
        .arg(field)
        .arg(increment)
}

pub fn hincrbyfloat(key: &str, field: &str, increment: f64) -> Command {
    Command::new(Verb::Hincrbyfloat)
        .arg(key)
        .arg(field)
        .arg(increment)
}
