use serde::Serialize;

use crate::command::{Command, ReadMode, Verb};
use crate::error::CodecError;
use crate::value_codec::ValueCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

impl InsertPosition {
    fn as_str(self) -> &'static str {
        match self {
            InsertPosition::Before => "BEFORE",
            InsertPosition::After => "AFTER",
        }
    }
}

fn push<C, T>(verb: Verb, codec: &C, key: &str, values: &[T]) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    let mut command = Command::new(verb).arg(key);
    for value in values {
        command = command.arg_object(codec, value)?;
    }
    Ok(command)
}

pub fn lpush<C, T>(codec: &C, key: &str, values: &[T]) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    push(Verb::Lpush, codec, key, values)
}

pub fn rpush<C, T>(codec: &C, key: &str, values: &[T]) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    push(Verb::Rpush, codec, key, values)
}

pub fn lpushx<C, T>(codec: &C, key: &str, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Lpushx).arg(key).arg_object(codec, value)
}

pub fn rpushx<C, T>(codec: &C, key: &str, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Rpushx).arg(key).arg_object(codec, value)
}

pub fn lpop(key: &str) -> Command {
    Command::new(Verb::Lpop).arg(key)
}

pub fn rpop(key: &str) -> Command {
    Command::new(Verb::Rpop).arg(key)
}

pub fn rpoplpush(source: &str, destination: &str) -> Command {
    Command::new(Verb::Rpoplpush).arg(source).arg(destination)
}

pub fn llen(key: &str) -> Command {
    Command::new(Verb::Llen).arg(key)
}

pub fn lindex(key: &str, index: i64) -> Command {
    Command::new(Verb::Lindex).arg(key).arg(index)
}

pub fn lrange(key: &str, start: i64, stop: i64) -> Command {
    Command::new(Verb::Lrange).arg(key).arg(start).arg(stop)
}

pub fn linsert<C, T>(
    codec: &C,
    key: &str,
    position: InsertPosition,
    pivot: &T,
    value: &T,
) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Linsert)
        .arg(key)
        .arg(position.as_str())
        .arg_object(codec, pivot)?
        .arg_object(codec, value)
}

pub fn lrem<C, T>(codec: &C, key: &str, count: i64, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Lrem)
        .arg(key)
        .arg(count)
        .arg_object(codec, value)
}

pub fn lset<C, T>(codec: &C, key: &str, index: i64, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Lset)
        .arg(key)
        .arg(index)
        .arg_object(codec, value)
}

pub fn ltrim(key: &str, start: i64, stop: i64) -> Command {
    Command::new(Verb::Ltrim).arg(key).arg(start).arg(stop)
}

/// Blocking pops reply with `[key, value]`; these builders keep only the value.
pub fn blpop(keys: &[&str], timeout_secs: u64) -> Command {
    blocking_pop(Verb::Blpop, keys, timeout_secs).with_read_mode(ReadMode::AlternatingKeyValue)
}

pub fn brpop(keys: &[&str], timeout_secs: u64) -> Command {
    blocking_pop(Verb::Brpop, keys, timeout_secs).with_read_mode(ReadMode::AlternatingKeyValue)
}

/// Like [`blpop`] but keeps the key naming the list that was served.
pub fn blpop_with_key(keys: &[&str], timeout_secs: u64) -> Command {
    blocking_pop(Verb::Blpop, keys, timeout_secs)
}

pub fn brpop_with_key(keys: &[&str], timeout_secs: u64) -> Command {
    blocking_pop(Verb::Brpop, keys, timeout_secs)
}

pub fn brpoplpush(source: &str, destination: &str, timeout_secs: u64) -> Command {
    Command::new(Verb::Brpoplpush)
        .arg(source)
        .arg(destination)
        .arg(timeout_secs)
}

fn blocking_pop(verb: Verb, keys: &[&str], timeout_secs: u64) -> Command {
    Command::new(verb)
        .args(keys.iter().copied())
        .arg(timeout_secs)
}
