use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::command::{Command, ReplyShape, ValueKind};
use crate::commands::{self, Aggregate, SetOptions};
use crate::config::ClientConfig;
use crate::convert::{self, FromValue, FromValues};
use crate::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::error::ClientError;
use crate::hash_table::HashTable;
use crate::list::List;
use crate::reply::{Reply, ReplyKind, Value};
use crate::request;
use crate::router::{HealthChecker, Router};
use crate::sequence::Sequence;
use crate::transport::{Connector, HostAddr, TcpConnector};
use crate::value_codec::{JsonCodec, ValueCodec};

struct Shared {
    router: Arc<Router>,
    dispatcher: Dispatcher,
    config: ClientConfig,
    _health: HealthChecker,
}

/// Handle to a set of server endpoints.
///
/// Cloning is cheap and clones share the router, the connection pools and the dispatcher.
/// [`Client::execute`] never fails and reports failures through the returned [`Reply`]; the
/// typed methods turn failed replies into [`ClientError`].
///
/// Values are serialized with the client's [`ValueCodec`]; [`Client::with_codec`] gives a handle
/// using another codec over the same endpoints.
pub struct Client<C: ValueCodec = JsonCodec> {
    shared: Arc<Shared>,
    codec: C,
}

impl<C: ValueCodec> Clone for Client<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl Client<JsonCodec> {
    /// Plain TCP client with the JSON codec. Must be called from within a tokio runtime.
    pub fn new(config: ClientConfig) -> Self {
        Client::with_connector(config, Arc::new(TcpConnector), JsonCodec)
    }
}

impl<C: ValueCodec> Client<C> {
    /// Must be called from within a tokio runtime; the health checker and the dispatch workers
    /// are spawned here.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>, codec: C) -> Self {
        let router = Arc::new(Router::new(config.pool_options(), connector));
        let health = HealthChecker::spawn(&router, config.health_check_interval);
        let dispatcher = Dispatcher::new(config.dispatch_workers);

        Client {
            shared: Arc::new(Shared {
                router,
                dispatcher,
                config,
                _health: health,
            }),
            codec,
        }
    }

    /// The same endpoints, serializing values with `codec`.
    pub fn with_codec<D: ValueCodec>(&self, codec: D) -> Client<D> {
        Client {
            shared: self.shared.clone(),
            codec,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn router(&self) -> &Router {
        &self.shared.router
    }

    /// Port `0` means the default port.
    pub fn add_write_host(&self, host: &str, port: u16) -> Endpoint {
        self.shared.router.add_write_host(HostAddr::new(host, port))
    }

    pub fn add_read_host(&self, host: &str, port: u16) -> Endpoint {
        self.shared.router.add_read_host(HostAddr::new(host, port))
    }

    /// Runs `command` and returns its reply, decoded against `shape`.
    pub async fn execute(&self, command: &Command, shape: ReplyShape) -> Reply {
        request::execute(
            &self.shared.router,
            &self.shared.dispatcher,
            command,
            shape,
        )
        .await
    }

    /// Runs `command`, turning a failed reply into an error.
    pub async fn call(&self, command: Command, shape: ReplyShape) -> Result<Reply, ClientError> {
        let reply = self.execute(&command, shape).await;
        match ClientError::from_reply(&reply) {
            Some(err) => Err(err),
            None => Ok(reply),
        }
    }

    /// Typed facade over the list stored at `key`.
    pub fn list<T>(&self, key: impl Into<String>) -> List<T, C>
    where
        T: Serialize + DeserializeOwned,
    {
        List::new(self.clone(), key.into())
    }

    /// Facade over the hash stored at `key`.
    pub fn hash_table(&self, key: impl Into<String>) -> HashTable<C> {
        HashTable::new(self.clone(), key.into())
    }

    /// Facade over the sorted set stored at `key`.
    pub fn sequence(&self, key: impl Into<String>) -> Sequence<C> {
        Sequence::new(self.clone(), key.into())
    }

    // Connection and server.

    pub async fn ping(&self) -> Result<bool, ClientError> {
        let reply = self.call(commands::server::ping(), ReplyShape::text()).await?;
        Ok(reply.message() == Some("PONG"))
    }

    pub async fn flushall(&self) -> Result<(), ClientError> {
        self.ok(commands::server::flushall()).await
    }

    pub async fn publish<T>(&self, channel: &str, message: &T) -> Result<i64, ClientError>
    where
        T: Serialize + ?Sized,
    {
        let command = commands::server::publish(&self.codec, channel, message)?;
        self.integer(command).await
    }

    // Keys.

    pub async fn del(&self, keys: &[&str]) -> Result<i64, ClientError> {
        self.integer(commands::keys::del(keys)).await
    }

    pub async fn exists(&self, keys: &[&str]) -> Result<i64, ClientError> {
        self.integer(commands::keys::exists(keys)).await
    }

    pub async fn expire(&self, key: &str, seconds: i64) -> Result<bool, ClientError> {
        self.boolean(commands::keys::expire(key, seconds)).await
    }

    pub async fn expireat(&self, key: &str, timestamp: i64) -> Result<bool, ClientError> {
        self.boolean(commands::keys::expireat(key, timestamp)).await
    }

    pub async fn pexpire(&self, key: &str, milliseconds: i64) -> Result<bool, ClientError> {
        self.boolean(commands::keys::pexpire(key, milliseconds)).await
    }

    pub async fn pexpireat(&self, key: &str, timestamp: i64) -> Result<bool, ClientError> {
        self.boolean(commands::keys::pexpireat(key, timestamp)).await
    }

    pub async fn ttl(&self, key: &str) -> Result<i64, ClientError> {
        self.integer(commands::keys::ttl(key)).await
    }

    pub async fn pttl(&self, key: &str) -> Result<i64, ClientError> {
        self.integer(commands::keys::pttl(key)).await
    }

    pub async fn persist(&self, key: &str) -> Result<bool, ClientError> {
        self.boolean(commands::keys::persist(key)).await
    }

    pub async fn rename(&self, key: &str, new_key: &str) -> Result<(), ClientError> {
        self.ok(commands::keys::rename(key, new_key)).await
    }

    pub async fn renamenx(&self, key: &str, new_key: &str) -> Result<bool, ClientError> {
        self.boolean(commands::keys::renamenx(key, new_key)).await
    }

    pub async fn touch(&self, keys: &[&str]) -> Result<i64, ClientError> {
        self.integer(commands::keys::touch(keys)).await
    }

    pub async fn unlink(&self, keys: &[&str]) -> Result<i64, ClientError> {
        self.integer(commands::keys::unlink(keys)).await
    }

    pub async fn key_type(&self, key: &str) -> Result<String, ClientError> {
        let reply = self.call(commands::keys::type_(key), ReplyShape::text()).await?;
        reply
            .message()
            .map(str::to_string)
            .ok_or_else(|| ClientError::unexpected("type name", &reply))
    }

    pub async fn randomkey(&self) -> Result<Option<String>, ClientError> {
        self.scalar(commands::keys::randomkey()).await
    }

    pub async fn dump(&self, key: &str) -> Result<Option<Bytes>, ClientError> {
        self.scalar(commands::keys::dump(key)).await
    }

    pub async fn move_to(&self, key: &str, db: u32) -> Result<bool, ClientError> {
        self.boolean(commands::keys::move_(key, db)).await
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, ClientError> {
        self.texts(commands::keys::keys(pattern)).await
    }

    // Strings.

    /// Value stored at `key`, decoded by the codec. `None` when the key does not exist.
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        self.object(commands::strings::get(key)).await
    }

    /// Value stored at `key` as text.
    pub async fn get_string(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.scalar(commands::strings::get(key)).await
    }

    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), ClientError>
    where
        T: Serialize + ?Sized,
    {
        self.set_with(key, value, SetOptions::default()).await.map(|_| ())
    }

    /// Stores `value` as is, without the codec.
    pub async fn set_string(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let command = commands::strings::set_scalar(key, value, SetOptions::default());
        self.ok(command).await
    }

    /// `SET` with expiration and condition. Returns whether the value was stored; a `NX`/`XX`
    /// condition that does not hold yields `false`.
    pub async fn set_with<T>(
        &self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<bool, ClientError>
    where
        T: Serialize + ?Sized,
    {
        let command = commands::strings::set(&self.codec, key, value, options)?;
        let reply = self.call(command, ReplyShape::text()).await?;
        match reply.kind() {
            ReplyKind::Simple => Ok(true),
            ReplyKind::Null => Ok(false),
            _ => Err(ClientError::unexpected("status", &reply)),
        }
    }

    pub async fn setex<T>(&self, key: &str, seconds: u64, value: &T) -> Result<(), ClientError>
    where
        T: Serialize + ?Sized,
    {
        let command = commands::strings::setex(&self.codec, key, seconds, value)?;
        self.ok(command).await
    }

    pub async fn psetex<T>(&self, key: &str, millis: u64, value: &T) -> Result<(), ClientError>
    where
        T: Serialize + ?Sized,
    {
        let command = commands::strings::psetex(&self.codec, key, millis, value)?;
        self.ok(command).await
    }

    pub async fn setnx<T>(&self, key: &str, value: &T) -> Result<bool, ClientError>
    where
        T: Serialize + ?Sized,
    {
        let command = commands::strings::setnx(&self.codec, key, value)?;
        self.boolean(command).await
    }

    /// Stores `value` and returns the previous one.
    pub async fn getset<T>(&self, key: &str, value: &T) -> Result<Option<T>, ClientError>
    where
        T: Serialize + DeserializeOwned,
    {
        let command = commands::strings::getset(&self.codec, key, value)?;
        self.object(command).await
    }

    pub async fn getrange(&self, key: &str, start: i64, end: i64) -> Result<String, ClientError> {
        let value = self
            .scalar(commands::strings::getrange(key, start, end))
            .await?;
        Ok(value.unwrap_or_default())
    }

    pub async fn setrange(&self, key: &str, offset: u64, value: &str) -> Result<i64, ClientError> {
        self.integer(commands::strings::setrange(key, offset, value))
            .await
    }

    pub async fn strlen(&self, key: &str) -> Result<i64, ClientError> {
        self.integer(commands::strings::strlen(key)).await
    }

    pub async fn append(&self, key: &str, value: &str) -> Result<i64, ClientError> {
        self.integer(commands::strings::append(key, value)).await
    }

    pub async fn incr(&self, key: &str) -> Result<i64, ClientError> {
        self.integer(commands::strings::incr(key)).await
    }

    pub async fn incrby(&self, key: &str, increment: i64) -> Result<i64, ClientError> {
        self.integer(commands::strings::incrby(key, increment))
            .await
    }

    pub async fn incrbyfloat(&self, key: &str, increment: f64) -> Result<f64, ClientError> {
        self.float(commands::strings::incrbyfloat(key, increment))
            .await
    }

    pub async fn decr(&self, key: &str) -> Result<i64, ClientError> {
        self.integer(commands::strings::decr(key)).await
    }

    pub async fn decrby(&self, key: &str, decrement: i64) -> Result<i64, ClientError> {
        self.integer(commands::strings::decrby(key, decrement))
            .await
    }

    pub async fn getbit(&self, key: &str, offset: u64) -> Result<bool, ClientError> {
        self.boolean(commands::strings::getbit(key, offset)).await
    }

    /// Returns the previous bit.
    pub async fn setbit(&self, key: &str, offset: u64, bit: bool) -> Result<bool, ClientError> {
        self.boolean(commands::strings::setbit(key, offset, bit))
            .await
    }

    /// Several keys at once, each read into its own type:
    ///
    /// ```no_run
    /// # async fn f(client: rustdis_client::Client) -> Result<(), rustdis_client::ClientError> {
    /// use rustdis_client::Object;
    ///
    /// let (name, visits, tags): (Option<String>, Option<i64>, Option<Object<Vec<String>>>) =
    ///     client.mget(&["name", "visits", "tags"]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn mget<R: FromValues>(&self, keys: &[&str]) -> Result<R, ClientError> {
        let shape = ReplyShape::new(R::kinds());
        let reply = self.call(commands::strings::mget(keys), shape).await?;
        R::from_items(&self.codec, reply.into_data())
    }

    /// `MGET` with one explicit value kind per key. Missing keys read as [`Value::Null`].
    pub async fn mget_values(
        &self,
        keys: &[&str],
        kinds: Vec<ValueKind>,
    ) -> Result<Vec<Value>, ClientError> {
        let reply = self
            .call(commands::strings::mget(keys), ReplyShape::new(kinds))
            .await?;
        Ok(reply.into_data().into_iter().map(|item| item.value).collect())
    }

    pub async fn mset<T>(&self, pairs: &[(&str, T)]) -> Result<(), ClientError>
    where
        T: Serialize,
    {
        let command = commands::strings::mset(&self.codec, pairs)?;
        self.ok(command).await
    }

    pub async fn msetnx<T>(&self, pairs: &[(&str, T)]) -> Result<bool, ClientError>
    where
        T: Serialize,
    {
        let command = commands::strings::msetnx(&self.codec, pairs)?;
        self.boolean(command).await
    }

    // Hashes.

    pub async fn hset<T>(&self, key: &str, fields: &[(&str, T)]) -> Result<i64, ClientError>
    where
        T: Serialize,
    {
        let command = commands::hashes::hset(&self.codec, key, fields)?;
        self.integer(command).await
    }

    pub async fn hget<T>(&self, key: &str, field: &str) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        self.object(commands::hashes::hget(key, field)).await
    }

    pub async fn hmget<T>(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<T>>, ClientError>
    where
        T: DeserializeOwned,
    {
        self.objects(commands::hashes::hmget(key, fields)).await
    }

    pub async fn hdel(&self, key: &str, fields: &[&str]) -> Result<i64, ClientError> {
        self.integer(commands::hashes::hdel(key, fields)).await
    }

    pub async fn hexists(&self, key: &str, field: &str) -> Result<bool, ClientError> {
        self.boolean(commands::hashes::hexists(key, field)).await
    }

    pub async fn hlen(&self, key: &str) -> Result<i64, ClientError> {
        self.integer(commands::hashes::hlen(key)).await
    }

    pub async fn hkeys(&self, key: &str) -> Result<Vec<String>, ClientError> {
        self.texts(commands::hashes::hkeys(key)).await
    }

    pub async fn hgetall<T>(&self, key: &str) -> Result<HashMap<String, T>, ClientError>
    where
        T: DeserializeOwned,
    {
        // Field names and values alternate; both come back as raw payloads.
        let reply = self
            .call(commands::hashes::hgetall(key), ReplyShape::object())
            .await?;

        let mut map = HashMap::with_capacity(reply.data().len() / 2);
        let mut items = reply.into_data().into_iter();
        while let (Some(field), Some(value)) = (items.next(), items.next()) {
            let field = match String::from_value(&self.codec, field.value)? {
                Some(field) => field,
                None => continue,
            };
            if let Some(value) = convert::decode_object(&self.codec, value.value)? {
                map.insert(field, value);
            }
        }
        Ok(map)
    }

    pub async fn hincrby(
        &self,
        key: &str,
        field: &str,
        increment: i64,
    ) -> Result<i64, ClientError> {
        self.integer(commands::hashes::hincrby(key, field, increment))
            .await
    }

    pub async fn hincrbyfloat(
        &self,
        key: &str,
        field: &str,
        increment: f64,
    ) -> Result<f64, ClientError> {
        self.float(commands::hashes::hincrbyfloat(key, field, increment))
            .await
    }

    /// Sets `field` only when it does not exist yet; tells whether it was set.
    pub async fn hsetnx<T>(&self, key: &str, field: &str, value: &T) -> Result<bool, ClientError>
    where
        T: Serialize + ?Sized,
    {
        let command = commands::hashes::hsetnx(&self.codec, key, field, value)?;
        self.boolean(command).await
    }

    pub async fn hmset<T>(&self, key: &str, fields: &[(&str, T)]) -> Result<(), ClientError>
    where
        T: Serialize,
    {
        let command = commands::hashes::hmset(&self.codec, key, fields)?;
        self.ok(command).await
    }

    /// Several fields at once, each read into its own type. See [`Client::mget`].
    pub async fn hmget_as<R>(&self, key: &str, fields: &[&str]) -> Result<R, ClientError>
    where
        R: FromValues,
    {
        let shape = ReplyShape::new(R::kinds());
        let reply = self
            .call(commands::hashes::hmget(key, fields), shape)
            .await?;
        R::from_items(&self.codec, reply.into_data())
    }

    /// Length of the stored value of `field`, `0` when it is missing.
    pub async fn hstrlen(&self, key: &str, field: &str) -> Result<i64, ClientError> {
        self.integer(commands::hashes::hstrlen(key, field)).await
    }

    pub async fn hvals<T>(&self, key: &str) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let values = self.objects(commands::hashes::hvals(key)).await?;
        Ok(values.into_iter().flatten().collect())
    }

    // Sorted sets.

    /// Stores the intersection of `keys` in `destination` and returns its size. `weights` pairs
    /// with `keys` by position; a weight of `0` counts as `1`.
    pub async fn zinterstore(
        &self,
        destination: &str,
        keys: &[&str],
        weights: &[f64],
        aggregate: Option<Aggregate>,
    ) -> Result<i64, ClientError> {
        let command = commands::sorted_sets::zinterstore(destination, keys, weights, aggregate);
        self.integer(command).await
    }

    // Reply conversions shared with the facades.

    pub(crate) async fn ok(&self, command: Command) -> Result<(), ClientError> {
        let reply = self.call(command, ReplyShape::text()).await?;
        match reply.kind() {
            ReplyKind::Simple => Ok(()),
            _ => Err(ClientError::unexpected("status", &reply)),
        }
    }

    pub(crate) async fn integer(&self, command: Command) -> Result<i64, ClientError> {
        let reply = self.call(command, ReplyShape::text()).await?;
        match reply.value() {
            Some(Value::Integer(n)) => Ok(n),
            _ => Err(ClientError::unexpected("integer", &reply)),
        }
    }

    pub(crate) async fn float(&self, command: Command) -> Result<f64, ClientError> {
        let reply = self.call(command, ReplyShape::text()).await?;
        reply
            .value()
            .and_then(|value| value.as_float())
            .ok_or_else(|| ClientError::unexpected("float", &reply))
    }

    pub(crate) async fn boolean(&self, command: Command) -> Result<bool, ClientError> {
        self.integer(command).await.map(|n| n != 0)
    }

    /// A single scalar slot.
    pub(crate) async fn scalar<T: FromValue>(
        &self,
        command: Command,
    ) -> Result<Option<T>, ClientError> {
        let reply = self
            .call(command, ReplyShape::single(T::KIND))
            .await?;
        match reply.into_value() {
            Some(value) => T::from_value(&self.codec, value),
            None => Ok(None),
        }
    }

    /// A single codec payload.
    pub(crate) async fn object<T: DeserializeOwned>(
        &self,
        command: Command,
    ) -> Result<Option<T>, ClientError> {
        let reply = self.call(command, ReplyShape::object()).await?;
        match reply.into_value() {
            Some(value) => convert::decode_object(&self.codec, value),
            None => Ok(None),
        }
    }

    /// An array of codec payloads.
    pub(crate) async fn objects<T: DeserializeOwned>(
        &self,
        command: Command,
    ) -> Result<Vec<Option<T>>, ClientError> {
        let reply = self.call(command, ReplyShape::object()).await?;
        reply
            .into_data()
            .into_iter()
            .map(|item| convert::decode_object(&self.codec, item.value))
            .collect()
    }

    pub(crate) async fn texts(&self, command: Command) -> Result<Vec<String>, ClientError> {
        let reply = self.call(command, ReplyShape::text()).await?;
        let mut texts = Vec::with_capacity(reply.data().len());
        for item in reply.into_data() {
            if let Some(text) = String::from_value(&self.codec, item.value)? {
                texts.push(text);
            }
        }
        Ok(texts)
    }
}
