//! Process configuration read from the environment.

use std::time::Duration;

use log::debug;

use crate::error::ConfigError;
use crate::logic::{
    assigner::ZoneWorkerPool,
    cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_LAYOUT_TTL},
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

const BIND_ADDR: &str = "GARDEN_BIND_ADDR";
const WORKER_POOL_SIZE: &str = "GARDEN_WORKER_POOL_SIZE";
const CACHE_TTL_SECS: &str = "GARDEN_CACHE_TTL_SECS";
const CACHE_CAPACITY: &str = "GARDEN_CACHE_CAPACITY";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub worker_pool_size: usize,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            worker_pool_size: ZoneWorkerPool::default_size(),
            cache_ttl: DEFAULT_LAYOUT_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

fn positive(key: &'static str, raw: String) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

impl ServerConfig {
    /// Loads `.env` if present, then reads the `GARDEN_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Missing keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(addr) = lookup(BIND_ADDR) {
            if addr.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: BIND_ADDR,
                    value: addr,
                    reason: "must not be empty".into(),
                });
            }
            config.bind_addr = addr.trim().to_string();
        }
        if let Some(raw) = lookup(WORKER_POOL_SIZE) {
            let size = positive(WORKER_POOL_SIZE, raw.clone())?;
            config.worker_pool_size =
                usize::try_from(size).map_err(|e| ConfigError::InvalidValue {
                    key: WORKER_POOL_SIZE,
                    value: raw,
                    reason: e.to_string(),
                })?;
        }
        if let Some(raw) = lookup(CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(positive(CACHE_TTL_SECS, raw)?);
        }
        if let Some(raw) = lookup(CACHE_CAPACITY) {
            config.cache_capacity = positive(CACHE_CAPACITY, raw)?;
        }
        Ok(config)
    }
}
