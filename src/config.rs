//! Process configuration.
//!
//! Everything is read from environment variables once at startup. The remote
//! store's API key is mandatory; every other setting has a default.

use crate::dispatch::{DeletePolicy, DispatcherConfig};

use anyhow::{Context, Result, bail};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_API_KEY: &str = "ORCHESTRATE_API_KEY";
pub const ENV_STORE_URL: &str = "STORE_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_IDLE_TIMEOUT_MS: &str = "WORKER_IDLE_TIMEOUT_MS";
pub const ENV_DISPATCH_BUFFER: &str = "DISPATCH_BUFFER";
pub const ENV_DELETE_POLICY: &str = "DELETE_POLICY";
pub const ENV_STORE_TIMEOUT_MS: &str = "STORE_TIMEOUT_MS";

const DEFAULT_STORE_URL: &str = "https://api.orchestrate.io";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub store_url: String,
    pub port: u16,
    pub store_timeout: Duration,
    pub dispatcher: DispatcherConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(ENV_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .with_context(|| format!("{} is not set", ENV_API_KEY))?;

        let store_url = lookup(ENV_STORE_URL).unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        let port = parse_var(&lookup, ENV_PORT, DEFAULT_PORT)?;

        let defaults = DispatcherConfig::default();
        let idle_ms = parse_var(
            &lookup,
            ENV_IDLE_TIMEOUT_MS,
            defaults.idle_timeout.as_millis() as u64,
        )?;
        if idle_ms == 0 {
            bail!("{} must be greater than zero", ENV_IDLE_TIMEOUT_MS);
        }

        let intake_capacity = parse_var(&lookup, ENV_DISPATCH_BUFFER, defaults.intake_capacity)?;
        if intake_capacity == 0 {
            bail!("{} must be greater than zero", ENV_DISPATCH_BUFFER);
        }

        let delete_policy = match lookup(ENV_DELETE_POLICY) {
            Some(raw) => raw
                .parse::<DeletePolicy>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid {}", ENV_DELETE_POLICY))?,
            None => defaults.delete_policy,
        };

        let timeout_ms = parse_var(&lookup, ENV_STORE_TIMEOUT_MS, DEFAULT_STORE_TIMEOUT_MS)?;

        Ok(Self {
            api_key,
            store_url,
            port,
            store_timeout: Duration::from_millis(timeout_ms),
            dispatcher: DispatcherConfig {
                idle_timeout: Duration::from_millis(idle_ms),
                intake_capacity,
                delete_policy,
            },
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow::anyhow!("invalid {}={:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}
