use serde::Serialize;

use crate::command::{Command, Scalar, Verb};
use crate::error::CodecError;
use crate::value_codec::ValueCodec;

/// Key expiration sent with `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// `EX <seconds>`
    Seconds(u64),
    /// `PX <milliseconds>`
    Millis(u64),
}

/// Only set the key when it does (`XX`) or does not (`NX`) exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    NotExists,
    Exists,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub expiry: Option<Expiry>,
    pub condition: Option<SetCondition>,
}

impl SetOptions {
    pub fn expire_in(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn only_if(mut self, condition: SetCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    fn apply(&self, mut command: Command) -> Command {
        command = match self.expiry {
            Some(Expiry::Seconds(seconds)) => command.arg("EX").arg(seconds),
            Some(Expiry::Millis(millis)) => command.arg("PX").arg(millis),
            None => command,
        };
        match self.condition {
            Some(SetCondition::NotExists) => command.arg("NX"),
            Some(SetCondition::Exists) => command.arg("XX"),
            None => command,
        }
    }
}

pub fn get(key: &str) -> Command {
    Command::new(Verb::Get).arg(key)
}

pub fn getdel(key: &str) -> Command {
    Command::new(Verb::Getdel).arg(key)
}

/// `SET` of a value serialized by `codec`.
pub fn set<C, T>(
    codec: &C,
    key: &str,
    value: &T,
    options: SetOptions,
) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    let command = Command::new(Verb::Set).arg(key).arg_object(codec, value)?;
    Ok(options.apply(command))
}

/// `SET` of a plain scalar, sent as is.
pub fn set_scalar(key: &str, value: impl Into<Scalar>, options: SetOptions) -> Command {
    options.apply(Command::new(Verb::Set).arg(key).arg(value))
}

pub fn setex<C, T>(codec: &C, key: &str, seconds: u64, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Setex)
        .arg(key)
        .arg(seconds)
        .arg_object(codec, value)
}

pub fn psetex<C, T>(codec: &C, key: &str, millis: u64, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Psetex)
        .arg(key)
        .arg(millis)
        .arg_object(codec, value)
}

pub fn setnx<C, T>(codec: &C, key: &str, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Setnx).arg(key).arg_object(codec, value)
}

pub fn getset<C, T>(codec: &C, key: &str, value: &T) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize + ?Sized,
{
    Command::new(Verb::Getset).arg(key).arg_object(codec, value)
}

pub fn getrange(key: &str, start: i64, end: i64) -> Command {
    Command::new(Verb::Getrange).arg(key).arg(start).arg(end)
}

pub fn setrange(key: &str, offset: u64, value: &str) -> Command {
    Command::new(Verb::Setrange).arg(key).arg(offset).arg(value)
}

pub fn strlen(key: &str) -> Command {
    Command::new(Verb::Strlen).arg(key)
}

pub fn append(key: &str, value: &str) -> Command {
    Command::new(Verb::Append).arg(key).arg(value)
}

pub fn incr(key: &str) -> Command {
    Command::new(Verb::Incr).arg(key)
}

pub fn incrby(key: &str, increment: i64) -> Command {
    Command::new(Verb::Incrby).arg(key).arg(increment)
}

pub fn incrbyfloat(key: &str, increment: f64) -> Command {
    Command::new(Verb::Incrbyfloat).arg(key).arg(increment)
}

pub fn decr(key: &str) -> Command {
    Command::new(Verb::Decr).arg(key)
}

pub fn decrby(key: &str, decrement: i64) -> Command {
    Command::new(Verb::Decrby).arg(key).arg(decrement)
}

pub fn getbit(key: &str, offset: u64) -> Command {
    Command::new(Verb::Getbit).arg(key).arg(offset)
}

pub fn setbit(key: &str, offset: u64, bit: bool) -> Command {
    Command::new(Verb::Setbit)
        .arg(key)
        .arg(offset)
        .arg(u64::from(bit))
}

pub fn mget(keys: &[&str]) -> Command {
    Command::new(Verb::Mget).args(keys.iter().copied())
}

pub fn mset<C, T>(codec: &C, pairs: &[(&str, T)]) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    pairs_command(Command::new(Verb::Mset), codec, pairs)
}

pub fn msetnx<C, T>(codec: &C, pairs: &[(&str, T)]) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    pairs_command(Command::new(Verb::Msetnx), codec, pairs)
}

fn pairs_command<C, T>(
    mut command: Command,
    codec: &C,
    pairs: &[(&str, T)],
) -> Result<Command, CodecError>
where
    C: ValueCodec,
    T: Serialize,
{
    for (key, value) in pairs {
        command = command.arg(*key).arg_object(codec, value)?;
    }
    Ok(command)
}
