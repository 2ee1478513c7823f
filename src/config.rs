//! Process configuration, read from environment variables at startup.
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::collector::SupervisorConfig;
use crate::runtime::{self, Endpoint};

pub const DOCKER_HOST_VAR: &str = "STATSQUID_DOCKER_HOST";
pub const REDIS_HOST_VAR: &str = "STATSQUID_REDIS_HOST";
pub const REDIS_PORT_VAR: &str = "STATSQUID_REDIS_PORT";
pub const GRACE_PERIOD_VAR: &str = "STATSQUID_GRACE_PERIOD_SECS";
pub const STOP_TIMEOUT_VAR: &str = "STATSQUID_STOP_TIMEOUT_SECS";

const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;
const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid runtime endpoint in `{key}`: {source}")]
    Endpoint {
        key: &'static str,
        #[source]
        source: runtime::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub docker_host: Endpoint,
    pub redis_host: String,
    pub redis_port: u16,
    pub grace_period: Duration,
    pub stop_timeout: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending variable if a value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let docker_host = lookup(DOCKER_HOST_VAR)
            .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_owned())
            .parse::<Endpoint>()
            .map_err(|source| Error::Endpoint {
                key: DOCKER_HOST_VAR,
                source,
            })?;
        let redis_host = lookup(REDIS_HOST_VAR)
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_owned());
        let redis_port = parse(REDIS_PORT_VAR, lookup(REDIS_PORT_VAR), DEFAULT_REDIS_PORT)?;
        let grace_period = parse(
            GRACE_PERIOD_VAR,
            lookup(GRACE_PERIOD_VAR),
            DEFAULT_GRACE_PERIOD_SECS,
        )?;
        let stop_timeout = parse(
            STOP_TIMEOUT_VAR,
            lookup(STOP_TIMEOUT_VAR),
            DEFAULT_STOP_TIMEOUT_SECS,
        )?;

        Ok(Self {
            docker_host,
            redis_host,
            redis_port,
            grace_period: Duration::from_secs(grace_period),
            stop_timeout: Duration::from_secs(stop_timeout),
        })
    }

    pub fn supervisor(&self) -> SupervisorConfig {
        SupervisorConfig {
            grace_period: self.grace_period,
            stop_timeout: self.stop_timeout,
            ..SupervisorConfig::default()
        }
    }
}

fn parse<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|err: T::Err| Error::InvalidValue {
                key,
                reason: err.to_string(),
                value,
            }),
    }
}
