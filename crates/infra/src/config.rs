//! Configuration loading and representation.
//!
//! Everything has a default, so an empty environment yields a working
//! in-memory setup. Environment variables:
//!
//! - `SHOPCART_CHECKOUT_POLICY`: `all_or_nothing` (default) or `best_effort`
//! - `SHOPCART_MAX_WRITE_ATTEMPTS`: optimistic-concurrency attempts per write (default 5)
//! - `SHOPCART_LOG_FORMAT`: `json` (default) or `pretty`; filtering follows `RUST_LOG`
//! - `DATABASE_URL`: Postgres connection string (only read by the `postgres` feature)

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopcart_observability::{LogConfig, LogFormat};

pub const ENV_CHECKOUT_POLICY: &str = "SHOPCART_CHECKOUT_POLICY";
pub const ENV_MAX_WRITE_ATTEMPTS: &str = "SHOPCART_MAX_WRITE_ATTEMPTS";
pub const ENV_LOG_FORMAT: &str = "SHOPCART_LOG_FORMAT";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// What checkout does when a product cannot cover the units in the cart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPolicy {
    /// Fail the whole checkout and leave every record as it was.
    #[default]
    AllOrNothing,
    /// Skip short products, report them per line, and still empty the cart.
    BestEffort,
}

impl FromStr for CheckoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_or_nothing" | "strict" => Ok(CheckoutPolicy::AllOrNothing),
            "best_effort" => Ok(CheckoutPolicy::BestEffort),
            _ => Err("expected `all_or_nothing` or `best_effort`".to_string()),
        }
    }
}

/// Cart engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub checkout_policy: CheckoutPolicy,
    /// Read-modify-write attempts before a stale version surfaces as `Conflict`.
    pub max_write_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checkout_policy: CheckoutPolicy::default(),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopcartConfig {
    pub engine: EngineConfig,
    pub log: LogConfig,
    pub database_url: Option<String>,
}

impl ShopcartConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CHECKOUT_POLICY) {
            config.engine.checkout_policy =
                raw.parse().map_err(|reason| ConfigError::InvalidValue {
                    key: ENV_CHECKOUT_POLICY,
                    value: raw.clone(),
                    reason,
                })?;
        }

        if let Some(raw) = lookup(ENV_MAX_WRITE_ATTEMPTS) {
            config.engine.max_write_attempts =
                raw.trim().parse().map_err(|e: core::num::ParseIntError| {
                    ConfigError::InvalidValue {
                        key: ENV_MAX_WRITE_ATTEMPTS,
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })?;
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log.format =
                raw.parse::<LogFormat>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: ENV_LOG_FORMAT,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
        }

        config.database_url = lookup(ENV_DATABASE_URL).filter(|url| !url.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_write_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_MAX_WRITE_ATTEMPTS,
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        Ok(())
    }
}
