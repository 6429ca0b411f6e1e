//! Application configuration from the environment.
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file. Binaries apply their command-line flags on top.

use std::net::SocketAddr;
use std::time::Duration;

use crate::client::DEFAULT_WAIT_TIMEOUT;
use crate::error::ConfigError;
use crate::orchestration::{WorkerOptions, DEFAULT_ACTIVITY_DELAY};
use crate::scheduler::{SchedulerConfig, DEFAULT_MAX_BATCH_SIZE, UnexpectedStatusPolicy, WaitMode};
use crate::store::{StoreConfig, DEFAULT_SCHEMA, SQLITE_MEMORY_URL};

pub const ENV_STORE_URL: &str = "BIKE_STORE_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_STORE_SCHEMA: &str = "BIKE_STORE_SCHEMA";
pub const ENV_ACTIVITY_DELAY_MS: &str = "BIKE_ACTIVITY_DELAY_MS";
pub const ENV_WAIT_TIMEOUT_SECS: &str = "BIKE_WAIT_TIMEOUT_SECS";
pub const ENV_API_ADDR: &str = "BIKE_API_ADDR";
pub const ENV_WAIT_CONCURRENCY: &str = "BIKE_WAIT_CONCURRENCY";
pub const ENV_UNEXPECTED_STATUS: &str = "BIKE_UNEXPECTED_STATUS";
pub const ENV_MAX_BATCH_SIZE: &str = "BIKE_MAX_BATCH_SIZE";

pub const DEFAULT_API_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_schema: String,
    pub activity_delay: Duration,
    pub wait_timeout: Duration,
    pub api_addr: SocketAddr,
    pub wait_concurrency: usize,
    pub unexpected_status: UnexpectedStatusPolicy,
    pub max_batch_size: usize,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store_url = get(ENV_STORE_URL)
            .or_else(|| get(ENV_DATABASE_URL))
            .unwrap_or_else(|| SQLITE_MEMORY_URL.to_string());
        let store_schema = get(ENV_STORE_SCHEMA).unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

        let activity_delay = match get(ENV_ACTIVITY_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse_number(ENV_ACTIVITY_DELAY_MS, &raw)?),
            None => DEFAULT_ACTIVITY_DELAY,
        };
        let wait_timeout = match get(ENV_WAIT_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = parse_number(ENV_WAIT_TIMEOUT_SECS, &raw)?;
                if secs == 0 {
                    return Err(ConfigError::invalid(
                        ENV_WAIT_TIMEOUT_SECS,
                        raw,
                        "must be greater than zero",
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_WAIT_TIMEOUT,
        };

        let api_addr_raw = get(ENV_API_ADDR).unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let api_addr = api_addr_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(ENV_API_ADDR, &api_addr_raw, e.to_string()))?;

        let wait_concurrency = match get(ENV_WAIT_CONCURRENCY) {
            Some(raw) => parse_number(ENV_WAIT_CONCURRENCY, &raw)? as usize,
            None => 1,
        };
        let unexpected_status = match get(ENV_UNEXPECTED_STATUS) {
            Some(raw) => parse_policy(&raw)?,
            None => UnexpectedStatusPolicy::Skip,
        };
        let max_batch_size = match get(ENV_MAX_BATCH_SIZE) {
            Some(raw) => usize::try_from(parse_number(ENV_MAX_BATCH_SIZE, &raw)?)
                .map_err(|e| ConfigError::invalid(ENV_MAX_BATCH_SIZE, &raw, e.to_string()))?,
            None => DEFAULT_MAX_BATCH_SIZE,
        };

        Ok(Self {
            store_url,
            store_schema,
            activity_delay,
            wait_timeout,
            api_addr,
            wait_concurrency,
            unexpected_status,
            max_batch_size,
        })
    }

    pub fn store(&self) -> Result<StoreConfig, ConfigError> {
        StoreConfig::from_url(&self.store_url, Some(&self.store_schema))
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            wait_mode: WaitMode::from_concurrency(self.wait_concurrency),
            unexpected_status: self.unexpected_status,
            max_batch_size: self.max_batch_size,
            ..SchedulerConfig::default()
        }
    }

    pub fn worker(&self) -> WorkerOptions {
        WorkerOptions {
            activity_delay: self.activity_delay,
            ..WorkerOptions::default()
        }
    }
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid(name, raw, e.to_string()))
}

pub fn parse_policy(raw: &str) -> Result<UnexpectedStatusPolicy, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "skip" => Ok(UnexpectedStatusPolicy::Skip),
        "abort" => Ok(UnexpectedStatusPolicy::Abort),
        _ => Err(ConfigError::invalid(
            ENV_UNEXPECTED_STATUS,
            raw,
            "expected 'skip' or 'abort'",
        )),
    }
}
