use crate::client::Client;
use crate::commands::sorted_sets;
use crate::error::ClientError;
use crate::value_codec::{JsonCodec, ValueCodec};

/// View of the sorted set stored at one key. Members are plain strings ordered by score.
pub struct Sequence<C: ValueCodec = JsonCodec> {
    client: Client<C>,
    key: String,
}

impl<C: ValueCodec> Sequence<C> {
    pub(crate) fn new(client: Client<C>, key: String) -> Self {
        Self { client, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Adds or rescores `members`; returns how many were new.
    pub async fn add(&self, members: &[(f64, &str)]) -> Result<i64, ClientError> {
        self.client
            .integer(sorted_sets::zadd(&self.key, members))
            .await
    }

    pub async fn score(&self, member: &str) -> Result<Option<f64>, ClientError> {
        self.client
            .scalar(sorted_sets::zscore(&self.key, member))
            .await
    }

    /// Adds `increment` to the score of `member` and returns the new score.
    pub async fn incrby(&self, member: &str, increment: f64) -> Result<f64, ClientError> {
        self.client
            .float(sorted_sets::zincrby(&self.key, increment, member))
            .await
    }

    pub async fn len(&self) -> Result<i64, ClientError> {
        self.client.integer(sorted_sets::zcard(&self.key)).await
    }

    pub async fn is_empty(&self) -> Result<bool, ClientError> {
        self.len().await.map(|len| len == 0)
    }

    /// Zero based position of `member`, lowest score first.
    pub async fn rank(&self, member: &str) -> Result<Option<i64>, ClientError> {
        self.client
            .scalar(sorted_sets::zrank(&self.key, member))
            .await
    }

    pub async fn rem(&self, members: &[&str]) -> Result<i64, ClientError> {
        self.client
            .integer(sorted_sets::zrem(&self.key, members))
            .await
    }

    /// Members between ranks `start` and `stop`, both inclusive.
    pub async fn range(&self, start: i64, stop: i64) -> Result<Vec<String>, ClientError> {
        self.client
            .texts(sorted_sets::zrange(&self.key, start, stop))
            .await
    }
}
