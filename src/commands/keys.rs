use crate::command::{Command, Verb};

pub fn del(keys: &[&str]) -> Command {
    Command::new(Verb::Del).args(keys.iter().copied())
}

pub fn exists(keys: &[&str]) -> Command {
    Command::new(Verb::Exists).args(keys.iter().copied())
}

pub fn touch(keys: &[&str]) -> Command {
    Command::new(Verb::Touch).args(keys.iter().copied())
}

pub fn unlink(keys: &[&str]) -> Command {
    Command::new(Verb::Unlink).args(keys.iter().copied())
}

pub fn expire(key: &str, seconds: i64) -> Command {
    Command::new(Verb::Expire).arg(key).arg(seconds)
}

/// `timestamp` is in unix seconds.
pub fn expireat(key: &str, timestamp: i64) -> Command {
    Command::new(Verb::Expireat).arg(key).arg(timestamp)
}

pub fn pexpire(key: &str, milliseconds: i64) -> Command {
    Command::new(Verb::Pexpire).arg(key).arg(milliseconds)
}

/// `timestamp` is in unix milliseconds.
pub fn pexpireat(key: &str, timestamp: i64) -> Command {
    Command::new(Verb::Pexpireat).arg(key).arg(timestamp)
}

pub fn ttl(key: &str) -> Command {
    Command::new(Verb::Ttl).arg(key)
}

pub fn pttl(key: &str) -> Command {
    Command::new(Verb::Pttl).arg(key)
}

pub fn persist(key: &str) -> Command {
    Command::new(Verb::Persist).arg(key)
}

pub fn rename(key: &str, new_key: &str) -> Command {
    Command::new(Verb::Rename).arg(key).arg(new_key)
}

pub fn renamenx(key: &str, new_key: &str) -> Command {
    Command::new(Verb::Renamenx).arg(key).arg(new_key)
}

pub fn type_(key: &str) -> Command {
    Command::new(Verb::Type).arg(key)
}

pub fn randomkey() -> Command {
    Command::new(Verb::Randomkey)
}

pub fn dump(key: &str) -> Command {
    Command::new(Verb::Dump).arg(key)
}

pub fn move_(key: &str, db: u32) -> Command {
    Command::new(Verb::Move).arg(key).arg(db)
}

pub fn keys(pattern: &str) -> Command {
    Command::new(Verb::Keys).arg(pattern)
}
