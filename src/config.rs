//! Store configuration.
//!
//! Defaults are built in. Each can be overridden from the environment:
//!
//! - `TCG_ID_MAX_ATTEMPTS` - attempts per ID before `IdGenerationFailed` (default: 10)
//! - `TCG_ORDER_MAX_ATTEMPTS` - attempts per order unit of work (default: 5)
//! - `TCG_ORDER_TIMEOUT_MS` - deadline for placing one order (default: 5000)

use crate::application::retry::RetryConfig;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ORDER_ATTEMPTS: u32 = 5;
const DEFAULT_ORDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Retry policy for `generate_id`.
    pub id_retry: RetryConfig,
    /// Retry policy for cart writes.
    pub cart_retry: RetryConfig,
    /// Retry policy for the order unit of work.
    pub order_retry: RetryConfig,
    /// Deadline for one `place_order` call, retries included.
    pub order_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_retry: RetryConfig::default(),
            cart_retry: RetryConfig::default(),
            order_retry: RetryConfig::default().with_max_attempts(DEFAULT_ORDER_ATTEMPTS),
            order_timeout: DEFAULT_ORDER_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Loads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads overrides through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(attempts) = parse_var::<u32>(&lookup, "TCG_ID_MAX_ATTEMPTS")? {
            config.id_retry.max_attempts = positive("TCG_ID_MAX_ATTEMPTS", attempts)?;
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "TCG_ORDER_MAX_ATTEMPTS")? {
            config.order_retry.max_attempts = positive("TCG_ORDER_MAX_ATTEMPTS", attempts)?;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "TCG_ORDER_TIMEOUT_MS")? {
            config.order_timeout = Duration::from_millis(positive("TCG_ORDER_TIMEOUT_MS", ms)?);
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))
        })
        .transpose()
}

fn positive<T: PartialOrd + Default>(name: &str, value: T) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnvVar(
            name.to_string(),
            "must be greater than zero".to_string(),
        ))
    }
}
