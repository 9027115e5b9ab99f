use std::env;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;
use crate::endpoint::PoolOptions;
use crate::Error;

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub db: u32,
    /// Ceiling of live connections per endpoint.
    pub max_connections: usize,
    pub health_check_interval: Duration,
    pub dispatch_workers: usize,
    pub max_frame_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db: 0,
            max_connections: 100,
            health_check_interval: Duration::from_millis(1000),
            dispatch_workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `RUSTDIS_DB`, `RUSTDIS_MAX_CONNECTIONS`,
    /// `RUSTDIS_HEALTH_CHECK_INTERVAL_MS`, `RUSTDIS_DISPATCH_WORKERS` and `MAX_FRAME_SIZE`.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(db) = var("RUSTDIS_DB")? {
            config.db = db;
        }
        if let Some(max) = var("RUSTDIS_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(ms) = var("RUSTDIS_HEALTH_CHECK_INTERVAL_MS")? {
            config.health_check_interval = Duration::from_millis(ms);
        }
        if let Some(workers) = var("RUSTDIS_DISPATCH_WORKERS")? {
            config.dispatch_workers = workers;
        }
        if let Some(size) = var("MAX_FRAME_SIZE")? {
            config.max_frame_size = size;
        }

        Ok(config)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            db: self.db,
            max_connections: self.max_connections,
            max_frame_size: self.max_frame_size,
        }
    }
}

fn var<T>(name: &str) -> Result<Option<T>, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{} must be a number, got {:?}: {}", name, value, e).into()),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{}: {}", name, e).into()),
    }
}
