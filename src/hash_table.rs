use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::Client;
use crate::convert::FromValues;
use crate::error::ClientError;
use crate::value_codec::{JsonCodec, ValueCodec};

/// View of the hash stored at one key. Field values go through the client's value codec and
/// may each have their own type.
pub struct HashTable<C: ValueCodec = JsonCodec> {
    client: Client<C>,
    key: String,
}

impl<C: ValueCodec> HashTable<C> {
    pub(crate) fn new(client: Client<C>, key: String) -> Self {
        Self { client, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns how many of `fields` were removed.
    pub async fn del(&self, fields: &[&str]) -> Result<i64, ClientError> {
        self.client.hdel(&self.key, fields).await
    }

    pub async fn exists(&self, field: &str) -> Result<bool, ClientError> {
        self.client.hexists(&self.key, field).await
    }

    pub async fn get<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>, ClientError> {
        self.client.hget(&self.key, field).await
    }

    /// Several fields, each read into its own type:
    ///
    /// ```no_run
    /// # async fn f(client: rustdis_client::Client) -> Result<(), rustdis_client::ClientError> {
    /// let user = client.hash_table("user:1");
    /// let (name, age): (Option<String>, Option<i64>) = user.get_many(&["name", "age"]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_many<R: FromValues>(&self, fields: &[&str]) -> Result<R, ClientError> {
        self.client.hmget_as(&self.key, fields).await
    }

    pub async fn get_all<T: DeserializeOwned>(&self) -> Result<HashMap<String, T>, ClientError> {
        self.client.hgetall(&self.key).await
    }

    pub async fn incrby(&self, field: &str, increment: i64) -> Result<i64, ClientError> {
        self.client.hincrby(&self.key, field, increment).await
    }

    pub async fn incrbyfloat(&self, field: &str, increment: f64) -> Result<f64, ClientError> {
        self.client
            .hincrbyfloat(&self.key, field, increment)
            .await
    }

    pub async fn keys(&self) -> Result<Vec<String>, ClientError> {
        self.client.hkeys(&self.key).await
    }

    pub async fn len(&self) -> Result<i64, ClientError> {
        self.client.hlen(&self.key).await
    }

    pub async fn is_empty(&self) -> Result<bool, ClientError> {
        self.len().await.map(|len| len == 0)
    }

    /// Returns `1` when `field` is new, `0` when it was overwritten.
    pub async fn set<T>(&self, field: &str, value: &T) -> Result<i64, ClientError>
    where
        T: Serialize,
    {
        self.client.hset(&self.key, &[(field, value)]).await
    }

    pub async fn mset<T>(&self, fields: &[(&str, T)]) -> Result<(), ClientError>
    where
        T: Serialize,
    {
        self.client.hmset(&self.key, fields).await
    }

    pub async fn setnx<T>(&self, field: &str, value: &T) -> Result<bool, ClientError>
    where
        T: Serialize + ?Sized,
    {
        self.client.hsetnx(&self.key, field, value).await
    }

    pub async fn strlen(&self, field: &str) -> Result<i64, ClientError> {
        self.client.hstrlen(&self.key, field).await
    }

    pub async fn values<T: DeserializeOwned>(&self) -> Result<Vec<T>, ClientError> {
        self.client.hvals(&self.key).await
    }
}
