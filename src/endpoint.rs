use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::codec::DEFAULT_MAX_FRAME_SIZE;
use crate::command::ReplyShape;
use crate::commands::server;
use crate::connection::Connection;
use crate::reply::Reply;
use crate::transport::{Connector, HostAddr};

/// Settings shared by every endpoint of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Database selected on every new connection. `0` skips the `SELECT`.
    pub db: u32,
    pub max_connections: usize,
    pub max_frame_size: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            db: 0,
            max_connections: 100,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

struct PoolState {
    idle: Vec<Connection>,
    // Idle plus borrowed.
    live: usize,
}

struct Inner {
    addr: HostAddr,
    options: PoolOptions,
    connector: Arc<dyn Connector>,
    available: AtomicBool,
    state: Mutex<PoolState>,
}

/// Connection pool for one server address.
///
/// Lends idle connections, creates new ones while below the connection ceiling and refuses
/// beyond it. Never waits for a connection to come back.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<Inner>,
}

impl Endpoint {
    pub fn new(addr: HostAddr, options: PoolOptions, connector: Arc<dyn Connector>) -> Endpoint {
        Endpoint {
            inner: Arc::new(Inner {
                addr,
                options,
                connector,
                // Assume the server is up until a health check says otherwise.
                available: AtomicBool::new(true),
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    live: 0,
                }),
            }),
        }
    }

    pub fn addr(&self) -> &HostAddr {
        &self.inner.addr
    }

    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::Acquire)
    }

    pub fn set_available(&self, available: bool) {
        let was = self.inner.available.swap(available, Ordering::AcqRel);
        if was != available {
            if available {
                info!(addr = %self.inner.addr, "endpoint is available");
            } else {
                warn!(addr = %self.inner.addr, "endpoint is not available");
            }
        }
    }

    /// Connections currently idle or borrowed.
    pub fn live_connections(&self) -> usize {
        self.state().live
    }

    pub fn idle_connections(&self) -> usize {
        self.state().idle.len()
    }

    /// Lends an idle connection, or a new unconnected one while below the ceiling.
    pub fn borrow(&self) -> Option<PooledConnection> {
        let mut state = self.state();
        if let Some(conn) = state.idle.pop() {
            return Some(PooledConnection::new(self.clone(), conn));
        }
        if state.live >= self.inner.options.max_connections {
            debug!(
                addr = %self.inner.addr,
                live = state.live,
                "connection pool exhausted"
            );
            return None;
        }
        state.live += 1;
        drop(state);
        let conn = Connection::new(self.inner.addr.clone(), self.inner.options.max_frame_size);
        Some(PooledConnection::new(self.clone(), conn))
    }

    /// Takes a connection back. Unhealthy connections are dropped and free their slot.
    fn give_back(&self, mut conn: Connection, healthy: bool) {
        let mut state = self.state();
        if healthy {
            state.idle.push(conn);
            return;
        }
        state.live = state.live.saturating_sub(1);
        drop(state);
        debug!(connection_id = %conn.id, addr = %self.inner.addr, "discarding connection");
        conn.close();
    }

    /// Opens the transport of `conn` if needed and selects the configured database.
    ///
    /// Failures come back as a `NetError` reply; `conn` is left closed.
    pub async fn connect(&self, conn: &mut Connection) -> Result<(), Reply> {
        if conn.is_connected() {
            return Ok(());
        }

        if let Err(err) = conn.connect(self.inner.connector.as_ref()).await {
            warn!(addr = %self.inner.addr, error = %err, "failed to connect");
            return Err(Reply::net_error(format!(
                "failed to connect to {}: {}",
                self.inner.addr, err
            )));
        }

        let db = self.inner.options.db;
        if db == 0 {
            return Ok(());
        }

        let failure = match conn.request(&server::select(db), ReplyShape::text()).await {
            Ok(reply) if !reply.is_error() => return Ok(()),
            Ok(reply) => reply.message().unwrap_or_default().to_string(),
            Err(err) => err.to_string(),
        };
        conn.close();
        warn!(addr = %self.inner.addr, db, error = %failure, "failed to select database");
        Err(Reply::net_error(format!(
            "failed to select database {} on {}: {}",
            db, self.inner.addr, failure
        )))
    }

    /// Sends `PING` over an idle connection, or a scratch one when none is idle, and records
    /// whether `PONG` came back.
    pub async fn ping(&self) -> bool {
        let pooled = self
            .state()
            .idle
            .pop()
            .map(|conn| PooledConnection::new(self.clone(), conn));

        let alive = match pooled {
            Some(mut conn) => {
                let alive = self.send_ping(&mut conn).await;
                conn.release(alive);
                alive
            }
            None => {
                let mut conn =
                    Connection::new(self.inner.addr.clone(), self.inner.options.max_frame_size);
                self.send_ping(&mut conn).await
            }
        };

        self.set_available(alive);
        alive
    }

    async fn send_ping(&self, conn: &mut Connection) -> bool {
        if self.connect(conn).await.is_err() {
            return false;
        }
        match conn.request(&server::ping(), ReplyShape::text()).await {
            Ok(reply) => reply.message() == Some("PONG"),
            Err(err) => {
                debug!(addr = %self.inner.addr, error = %err, "ping failed");
                false
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A connection lent by an [`Endpoint`].
///
/// Goes back to the idle list only through [`PooledConnection::release`] with `healthy` set.
/// Dropped any other way, for instance when the request future is cancelled mid-reply, the
/// connection is closed and its slot freed.
pub struct PooledConnection {
    endpoint: Endpoint,
    conn: Option<Connection>,
    healthy: bool,
}

impl PooledConnection {
    fn new(endpoint: Endpoint, conn: Connection) -> Self {
        PooledConnection {
            endpoint,
            conn: Some(conn),
            healthy: false,
        }
    }

    pub fn release(mut self, healthy: bool) {
        self.healthy = healthy;
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `drop` takes the connection out.
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.endpoint.give_back(conn, self.healthy);
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("addr", &self.inner.addr)
            .field("available", &self.is_available())
            .field("live", &self.live_connections())
            .finish()
    }
}
