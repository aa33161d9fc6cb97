//! Filter and store configuration
//!
//! # Example
//!
//! ```
//! use remote_bloom::domain::FilterOptionsBuilder;
//!
//! let options = FilterOptionsBuilder::new("signups")
//!     .capacity(1000)
//!     .error_rate(0.01)
//!     .host("10.0.0.5")
//!     .db(2)
//!     .build()
//!     .expect("valid options");
//!
//! assert_eq!(options.filter_config().unwrap().bits(), 9586);
//! ```

use std::time::Duration;

use serde::Deserialize;

use super::parameters::calculate_optimal_parameters;
use crate::error::FilterError;

/// Default store host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default store port
pub const DEFAULT_PORT: u16 = 6379;
/// Default bound on connection establishment
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Immutable sizing of one filter
///
/// `bits` and `hashes` are derived once, in [`FilterConfig::new`].
#[derive(Clone, Debug, PartialEq)]
pub struct FilterConfig {
    name: String,
    capacity: u64,
    error_rate: f64,
    bits: u64,
    hashes: u32,
}

impl FilterConfig {
    /// Validate the inputs and derive the filter size
    pub fn new(name: impl Into<String>, capacity: u64, error_rate: f64) -> Result<Self, FilterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(FilterError::InvalidConfig(
                "filter name cannot be empty".to_string(),
            ));
        }

        let params = calculate_optimal_parameters(capacity, error_rate)?;

        Ok(Self {
            name,
            capacity,
            error_rate,
            bits: params.bits,
            hashes: params.hashes,
        })
    }

    /// Name, also the prefix of every shard key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expected number of items
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Target false positive rate
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Size of the logical bit array
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Hash rounds per item
    pub fn hashes(&self) -> u32 {
        self.hashes
    }
}

/// Where and how to reach the bit store
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Store host name or address
    pub host: String,
    /// Store port
    pub port: u16,
    /// Credential for `AUTH`; `None` or empty means ping instead
    pub password: Option<String>,
    /// Logical database index passed to `SELECT`
    pub db: i64,
    /// Bound on connection establishment
    #[serde(rename = "connect_timeout_ms", deserialize_with = "duration_ms::deserialize")]
    pub connect_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
            db: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl StoreOptions {
    /// The password to authenticate with, if one is set and non-empty
    pub fn credential(&self) -> Option<&str> {
        self.password.as_deref().filter(|password| !password.is_empty())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Everything needed to open a filter
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FilterOptions {
    /// Filter name / shard key prefix
    pub name: String,
    /// Expected number of items
    pub capacity: u64,
    /// Target false positive rate
    pub error_rate: f64,
    /// Store connection settings
    #[serde(default)]
    pub store: StoreOptions,
}

impl FilterOptions {
    /// Derive the filter sizing, validating capacity, error rate and name
    pub fn filter_config(&self) -> Result<FilterConfig, FilterError> {
        FilterConfig::new(self.name.clone(), self.capacity, self.error_rate)
    }

    /// Validate all fields
    pub fn validate(&self) -> Result<(), FilterError> {
        self.filter_config()?;
        if self.store.host.is_empty() {
            return Err(FilterError::InvalidConfig(
                "store host cannot be empty".to_string(),
            ));
        }
        if self.store.db < 0 {
            return Err(FilterError::InvalidConfig(format!(
                "database index {} cannot be negative",
                self.store.db
            )));
        }
        Ok(())
    }
}

/// Builder for [`FilterOptions`] with validation
#[derive(Debug)]
pub struct FilterOptionsBuilder {
    name: String,
    capacity: Option<u64>,
    error_rate: Option<f64>,
    store: StoreOptions,
}

impl FilterOptionsBuilder {
    /// Default capacity when none is given
    pub const DEFAULT_CAPACITY: u64 = 100;
    /// Default error rate when none is given
    pub const DEFAULT_ERROR_RATE: f64 = 0.1;

    /// Start a builder for the filter called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: None,
            error_rate: None,
            store: StoreOptions::default(),
        }
    }

    /// Set the expected number of items
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the target false positive rate
    pub fn error_rate(mut self, error_rate: f64) -> Self {
        self.error_rate = Some(error_rate);
        self
    }

    /// Set the store host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.store.host = host.into();
        self
    }

    /// Set the store port
    pub fn port(mut self, port: u16) -> Self {
        self.store.port = port;
        self
    }

    /// Authenticate with `password` after connecting
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.store.password = Some(password.into());
        self
    }

    /// Select logical database `db` after connecting
    pub fn db(mut self, db: i64) -> Self {
        self.store.db = db;
        self
    }

    /// Bound connection establishment to `timeout`
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.store.connect_timeout = timeout;
        self
    }

    /// Build the options, validating all parameters
    pub fn build(self) -> Result<FilterOptions, FilterError> {
        let options = FilterOptions {
            name: self.name,
            capacity: self.capacity.unwrap_or(Self::DEFAULT_CAPACITY),
            error_rate: self.error_rate.unwrap_or(Self::DEFAULT_ERROR_RATE),
            store: self.store,
        };
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_config_derives_size_once() {
        let config = FilterConfig::new("test", 1000, 0.01).unwrap();
        assert_eq!(config.name(), "test");
        assert_eq!(config.capacity(), 1000);
        assert_eq!(config.bits(), 9586);
        assert_eq!(config.hashes(), 7);
    }

    #[test]
    fn test_filter_config_rejects_empty_name() {
        let result = FilterConfig::new("", 1000, 0.01);
        assert!(matches!(result, Err(FilterError::InvalidConfig(_))));
    }

    #[test]
    fn test_filter_config_rejects_bad_error_rate() {
        let result = FilterConfig::new("test", 1000, 1.0);
        assert!(matches!(result, Err(FilterError::InvalidConfig(_))));
    }

    #[test]
    fn test_store_defaults() {
        let store = StoreOptions::default();
        assert_eq!(store.host, "127.0.0.1");
        assert_eq!(store.port, 6379);
        assert_eq!(store.db, 0);
        assert_eq!(store.connect_timeout, Duration::from_millis(1500));
        assert_eq!(store.credential(), None);
    }

    #[test]
    fn test_empty_password_means_no_credential() {
        let store = StoreOptions {
            password: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(store.credential(), None);

        let store = StoreOptions {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert_eq!(store.credential(), Some("hunter2"));
    }

    #[test]
    fn test_builder_creates_valid_options() {
        let options = FilterOptionsBuilder::new("signups")
            .capacity(10_000)
            .error_rate(0.1)
            .host("redis.internal")
            .port(6380)
            .password("secret")
            .db(3)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .expect("Should create valid options");

        assert_eq!(options.name, "signups");
        assert_eq!(options.capacity, 10_000);
        assert_eq!(options.store.host, "redis.internal");
        assert_eq!(options.store.port, 6380);
        assert_eq!(options.store.credential(), Some("secret"));
        assert_eq!(options.store.db, 3);
        assert_eq!(options.store.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_builder_uses_defaults() {
        let options = FilterOptionsBuilder::new("f").build().unwrap();
        assert_eq!(options.capacity, FilterOptionsBuilder::DEFAULT_CAPACITY);
        assert_eq!(options.error_rate, FilterOptionsBuilder::DEFAULT_ERROR_RATE);
        assert_eq!(options.store, StoreOptions::default());
    }

    #[test]
    fn test_builder_rejects_zero_capacity() {
        let result = FilterOptionsBuilder::new("f").capacity(0).build();
        assert!(matches!(result, Err(FilterError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_rejects_negative_db() {
        let result = FilterOptionsBuilder::new("f").db(-1).build();
        assert!(matches!(result, Err(FilterError::InvalidConfig(_))));
    }
}
