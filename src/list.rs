use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::Client;
use crate::command::{Command, ReplyShape};
use crate::commands::lists;
use crate::commands::InsertPosition;
use crate::convert::{self, FromValue};
use crate::error::ClientError;
use crate::value_codec::{JsonCodec, ValueCodec};

/// Typed view of the list stored at one key. Elements go through the client's value codec.
///
/// Blocking pops pass their timeout, in seconds, to the server; `0` blocks until an element
/// arrives. The client adds no timeout of its own.
pub struct List<T, C: ValueCodec = JsonCodec> {
    client: Client<C>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> List<T, C>
where
    T: Serialize + DeserializeOwned,
    C: ValueCodec,
{
    pub(crate) fn new(client: Client<C>, key: String) -> Self {
        Self {
            client,
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Prepends `values` (`LPUSH`); returns the new length.
    pub async fn push(&self, values: &[T]) -> Result<i64, ClientError> {
        self.lpush(values).await
    }

    pub async fn lpush(&self, values: &[T]) -> Result<i64, ClientError> {
        let command = lists::lpush(self.client.codec(), &self.key, values)?;
        self.client.integer(command).await
    }

    pub async fn rpush(&self, values: &[T]) -> Result<i64, ClientError> {
        let command = lists::rpush(self.client.codec(), &self.key, values)?;
        self.client.integer(command).await
    }

    /// Prepends only when the list exists.
    pub async fn pushx(&self, value: &T) -> Result<i64, ClientError> {
        let command = lists::lpushx(self.client.codec(), &self.key, value)?;
        self.client.integer(command).await
    }

    pub async fn rpushx(&self, value: &T) -> Result<i64, ClientError> {
        let command = lists::rpushx(self.client.codec(), &self.key, value)?;
        self.client.integer(command).await
    }

    /// Removes and returns the first element (`LPOP`).
    pub async fn pop(&self) -> Result<Option<T>, ClientError> {
        self.lpop().await
    }

    pub async fn lpop(&self) -> Result<Option<T>, ClientError> {
        self.client.object(lists::lpop(&self.key)).await
    }

    pub async fn rpop(&self) -> Result<Option<T>, ClientError> {
        self.client.object(lists::rpop(&self.key)).await
    }

    pub async fn rpoplpush(&self, destination: &str) -> Result<Option<T>, ClientError> {
        self.client
            .object(lists::rpoplpush(&self.key, destination))
            .await
    }

    pub async fn len(&self) -> Result<i64, ClientError> {
        self.client.integer(lists::llen(&self.key)).await
    }

    pub async fn is_empty(&self) -> Result<bool, ClientError> {
        self.len().await.map(|len| len == 0)
    }

    pub async fn index(&self, index: i64) -> Result<Option<T>, ClientError> {
        self.client.object(lists::lindex(&self.key, index)).await
    }

    /// Elements between `start` and `stop`, both inclusive.
    pub async fn range(&self, start: i64, stop: i64) -> Result<Vec<T>, ClientError> {
        let values = self
            .client
            .objects(lists::lrange(&self.key, start, stop))
            .await?;
        Ok(values.into_iter().flatten().collect())
    }

    /// Inserts `value` next to the first occurrence of `pivot`. Returns the new length, or `-1`
    /// when `pivot` is not in the list.
    pub async fn insert(
        &self,
        position: InsertPosition,
        pivot: &T,
        value: &T,
    ) -> Result<i64, ClientError> {
        let command = lists::linsert(self.client.codec(), &self.key, position, pivot, value)?;
        self.client.integer(command).await
    }

    pub async fn rem(&self, count: i64, value: &T) -> Result<i64, ClientError> {
        let command = lists::lrem(self.client.codec(), &self.key, count, value)?;
        self.client.integer(command).await
    }

    pub async fn set(&self, index: i64, value: &T) -> Result<(), ClientError> {
        let command = lists::lset(self.client.codec(), &self.key, index, value)?;
        self.client.ok(command).await
    }

    pub async fn trim(&self, start: i64, stop: i64) -> Result<(), ClientError> {
        self.client.ok(lists::ltrim(&self.key, start, stop)).await
    }

    /// `None` when the timeout expires first.
    pub async fn blpop(&self, timeout_secs: u64) -> Result<Option<T>, ClientError> {
        self.client
            .object(lists::blpop(&[self.key.as_str()], timeout_secs))
            .await
    }

    pub async fn brpop(&self, timeout_secs: u64) -> Result<Option<T>, ClientError> {
        self.client
            .object(lists::brpop(&[self.key.as_str()], timeout_secs))
            .await
    }

    pub async fn brpoplpush(
        &self,
        destination: &str,
        timeout_secs: u64,
    ) -> Result<Option<T>, ClientError> {
        self.client
            .object(lists::brpoplpush(&self.key, destination, timeout_secs))
            .await
    }

    /// Pops from this list or, when it is empty, from the first non-empty list of `others`.
    /// Returns the key of the list that was served together with the element.
    pub async fn blpop_with_key(
        &self,
        others: &[&str],
        timeout_secs: u64,
    ) -> Result<Option<(String, T)>, ClientError> {
        let keys = self.keys_with(others);
        self.pop_with_key(lists::blpop_with_key(&keys, timeout_secs))
            .await
    }

    pub async fn brpop_with_key(
        &self,
        others: &[&str],
        timeout_secs: u64,
    ) -> Result<Option<(String, T)>, ClientError> {
        let keys = self.keys_with(others);
        self.pop_with_key(lists::brpop_with_key(&keys, timeout_secs))
            .await
    }

    fn keys_with<'a>(&'a self, others: &[&'a str]) -> Vec<&'a str> {
        let mut keys = Vec::with_capacity(others.len() + 1);
        keys.push(self.key.as_str());
        keys.extend_from_slice(others);
        keys
    }

    async fn pop_with_key(
        &self,
        command: Command,
    ) -> Result<Option<(String, T)>, ClientError> {
        let codec = self.client.codec();
        let reply = self.client.call(command, ReplyShape::object()).await?;
        if reply.is_null() {
            return Ok(None);
        }

        let mut items = reply.into_data().into_iter();
        match (items.next(), items.next()) {
            (Some(key), Some(value)) => {
                let key = String::from_value(codec, key.value)?;
                let value = convert::decode_object(codec, value.value)?;
                Ok(key.zip(value))
            }
            _ => Err(ClientError::Data(
                "blocking pop reply is not a [key, value] pair".to_string(),
            )),
        }
    }
}
