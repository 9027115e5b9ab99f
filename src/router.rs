use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use crate::endpoint::{Endpoint, PoolOptions};
use crate::transport::{Connector, HostAddr};

type Snapshot = Arc<[Endpoint]>;

/// Picks the endpoint a request runs against.
///
/// Write and read endpoints are kept as immutable snapshots. Adding an endpoint publishes a new
/// snapshot; selection clones the current one and scans it without holding any lock, so it never
/// sees a half-updated set and never waits on a writer.
pub struct Router {
    options: PoolOptions,
    connector: Arc<dyn Connector>,
    write: RwLock<Snapshot>,
    read: RwLock<Snapshot>,
}

impl Router {
    pub fn new(options: PoolOptions, connector: Arc<dyn Connector>) -> Router {
        Router {
            options,
            connector,
            write: RwLock::new(Arc::from(Vec::<Endpoint>::new())),
            read: RwLock::new(Arc::from(Vec::<Endpoint>::new())),
        }
    }

    pub fn add_write_host(&self, addr: HostAddr) -> Endpoint {
        info!(%addr, "adding write endpoint");
        let endpoint = self.endpoint(addr);
        publish(&self.write, endpoint.clone());
        endpoint
    }

    pub fn add_read_host(&self, addr: HostAddr) -> Endpoint {
        info!(%addr, "adding read endpoint");
        let endpoint = self.endpoint(addr);
        publish(&self.read, endpoint.clone());
        endpoint
    }

    pub fn write_hosts(&self) -> Snapshot {
        snapshot(&self.write)
    }

    pub fn read_hosts(&self) -> Snapshot {
        snapshot(&self.read)
    }

    /// First available write endpoint. Never falls back to read endpoints.
    pub fn get_write_host(&self) -> Option<Endpoint> {
        first_available(&self.write_hosts())
    }

    /// First available read endpoint, else whatever [`Router::get_write_host`] returns.
    pub fn get_read_host(&self) -> Option<Endpoint> {
        first_available(&self.read_hosts()).or_else(|| self.get_write_host())
    }

    pub fn route(&self, read_only: bool) -> Option<Endpoint> {
        if read_only {
            self.get_read_host()
        } else {
            self.get_write_host()
        }
    }

    /// Pings every endpoint once and waits for all probes.
    pub async fn check_health(&self) {
        let endpoints: Vec<Endpoint> = self
            .write_hosts()
            .iter()
            .chain(self.read_hosts().iter())
            .cloned()
            .collect();

        let results = join_all(endpoints.iter().map(|endpoint| endpoint.ping())).await;
        debug!(
            endpoints = results.len(),
            available = results.iter().filter(|alive| **alive).count(),
            "health check finished"
        );
    }

    fn endpoint(&self, addr: HostAddr) -> Endpoint {
        Endpoint::new(addr, self.options, self.connector.clone())
    }
}

fn snapshot(slot: &RwLock<Snapshot>) -> Snapshot {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn publish(slot: &RwLock<Snapshot>, endpoint: Endpoint) {
    let mut current = slot.write().unwrap_or_else(PoisonError::into_inner);
    let mut next = current.to_vec();
    next.push(endpoint);
    *current = Arc::from(next);
}

fn first_available(endpoints: &[Endpoint]) -> Option<Endpoint> {
    endpoints.iter().find(|endpoint| endpoint.is_available()).cloned()
}

/// Background task probing every endpoint of a router on a fixed period.
///
/// A cycle starts only after the previous one has finished. The task holds a weak reference and
/// ends once the router is gone; dropping the checker stops it right away.
#[derive(Debug)]
pub struct HealthChecker {
    handle: JoinHandle<()>,
}

impl HealthChecker {
    /// Must be called from within a tokio runtime.
    pub fn spawn(router: &Arc<Router>, interval: Duration) -> HealthChecker {
        let router = Arc::downgrade(router);
        let handle = tokio::spawn(run_health_checks(router, interval));
        HealthChecker { handle }
    }
}

impl Drop for HealthChecker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_health_checks(router: Weak<Router>, interval: Duration) {
    loop {
        time::sleep(interval).await;
        let router = match router.upgrade() {
            Some(router) => router,
            None => return,
        };
        router.check_health().await;
    }
}
