use crate::command::{Command, Verb};

/// How `ZINTERSTORE` combines the scores of a member found in several sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregate {
    #[default]
    Sum,
    Min,
    Max,
}

impl Aggregate {
    fn as_str(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// `ZINTERSTORE destination numkeys key [key ...] [WEIGHTS w ...] [AGGREGATE SUM|MIN|MAX]`.
///
/// `weights` pairs with `keys` by position. A weight of `0` is sent as `1`, and `WEIGHTS` is
/// only written when every key has a weight.
pub fn zinterstore(
    destination: &str,
    keys: &[&str],
    weights: &[f64],
    aggregate: Option<Aggregate>,
) -> Command {
    let mut command = Command::new(Verb::Zinterstore)
        .arg(destination)
        .arg(keys.len())
        .args(keys.iter().copied());

    if !weights.is_empty() && weights.len() == keys.len() {
        command = command.arg("WEIGHTS").args(
            weights
                .iter()
                .map(|&weight| if weight == 0.0 { 1.0 } else { weight }),
        );
    }

    if let Some(aggregate) = aggregate {
        command = command.arg("AGGREGATE").arg(aggregate.as_str());
    }

    command
}

pub fn zadd(key: &str, members: &[(f64, &str)]) -> Command {
    let mut command = Command::new(Verb::Zadd).arg(key);
    for (score, member) in members {
        command = command.arg(*score).arg(*member);
    }
    command
}

pub fn zscore(key: &str, member: &str) -> Command {
    Command::new(Verb::Zscore).arg(key).arg(member)
}

pub fn zincrby(key: &str, increment: f64, member: &str) -> Command {
    Command::new(Verb::Zincrby)
        .arg(key)
        .arg(increment)
        .arg(member)
}

pub fn zcard(key: &str) -> Command {
    Command::new(Verb::Zcard).arg(key)
}

pub fn zrank(key: &str, member: &str) -> Command {
    Command::new(Verb::Zrank).arg(key).arg(member)
}

pub fn zrem(key: &str, members: &[&str]) -> Command {
    Command::new(Verb::Zrem)
        .arg(key)
        .args(members.iter().copied())
}

/// Members from rank `start` to `stop`, both inclusive, lowest score first.
pub fn zrange(key: &str, start: i64, stop: i64) -> Command {
    Command::new(Verb::Zrange).arg(key).arg(start).arg(stop)
}
