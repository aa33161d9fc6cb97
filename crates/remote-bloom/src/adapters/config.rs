//! Loading filter options from TOML files and the environment
//!
//! # Config File Format
//!
//! ```toml
//! [filter]
//! name = "signups"
//! capacity = 1000000
//! error_rate = 0.001
//!
//! [store]
//! host = "10.0.0.5"
//! port = 6379
//! password = "secret"
//! db = 2
//! connect_timeout_ms = 1500
//! ```
//!
//! The `[store]` table and every key in it are optional.
//!
//! # Environment Variables
//!
//! - `REMOTE_BLOOM_NAME`: filter name
//! - `REMOTE_BLOOM_CAPACITY`: expected number of items
//! - `REMOTE_BLOOM_ERROR_RATE`: target false positive rate
//! - `REMOTE_BLOOM_HOST`, `REMOTE_BLOOM_PORT`: store address
//! - `REMOTE_BLOOM_PASSWORD`: store credential
//! - `REMOTE_BLOOM_DB`: logical database index
//! - `REMOTE_BLOOM_CONNECT_TIMEOUT_MS`: connection establishment bound

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::domain::{FilterOptions, FilterOptionsBuilder, StoreOptions};
use crate::error::FilterError;

pub const ENV_NAME: &str = "REMOTE_BLOOM_NAME";
pub const ENV_CAPACITY: &str = "REMOTE_BLOOM_CAPACITY";
pub const ENV_ERROR_RATE: &str = "REMOTE_BLOOM_ERROR_RATE";
pub const ENV_HOST: &str = "REMOTE_BLOOM_HOST";
pub const ENV_PORT: &str = "REMOTE_BLOOM_PORT";
pub const ENV_PASSWORD: &str = "REMOTE_BLOOM_PASSWORD";
pub const ENV_DB: &str = "REMOTE_BLOOM_DB";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "REMOTE_BLOOM_CONNECT_TIMEOUT_MS";

/// Configuration file structure
#[derive(Debug, Deserialize)]
struct ConfigFile {
    filter: FilterTable,
    #[serde(default)]
    store: StoreOptions,
}

#[derive(Debug, Deserialize)]
struct FilterTable {
    name: String,
    #[serde(default = "default_capacity")]
    capacity: u64,
    #[serde(default = "default_error_rate")]
    error_rate: f64,
}

fn default_capacity() -> u64 {
    FilterOptionsBuilder::DEFAULT_CAPACITY
}

fn default_error_rate() -> f64 {
    FilterOptionsBuilder::DEFAULT_ERROR_RATE
}

/// Load and validate options from a TOML file
///
/// # Errors
///
/// `InvalidConfig` if the file cannot be read, parsed, or validated.
pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<FilterOptions, FilterError> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        FilterError::InvalidConfig(format!(
            "cannot read {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    debug!(path = %path.as_ref().display(), "Loaded filter config file");
    parse_toml(&content)
}

/// Parse and validate options from TOML text
pub fn parse_toml(content: &str) -> Result<FilterOptions, FilterError> {
    let file: ConfigFile =
        toml::from_str(content).map_err(|e| FilterError::InvalidConfig(e.to_string()))?;

    let options = FilterOptions {
        name: file.filter.name,
        capacity: file.filter.capacity,
        error_rate: file.filter.error_rate,
        store: file.store,
    };
    options.validate()?;
    Ok(options)
}

/// Override `options` with any `REMOTE_BLOOM_*` variables that are set
pub fn apply_env(options: FilterOptions) -> Result<FilterOptions, FilterError> {
    apply_vars(options, |key| env::var(key).ok())
}

/// Build options from the environment alone
///
/// `REMOTE_BLOOM_NAME` is required; everything else has a default.
pub fn from_env() -> Result<FilterOptions, FilterError> {
    from_vars(|key| env::var(key).ok())
}

fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<FilterOptions, FilterError> {
    let name = lookup(ENV_NAME)
        .ok_or_else(|| FilterError::InvalidConfig(format!("{ENV_NAME} is not set")))?;
    let options = FilterOptions {
        name,
        capacity: FilterOptionsBuilder::DEFAULT_CAPACITY,
        error_rate: FilterOptionsBuilder::DEFAULT_ERROR_RATE,
        store: StoreOptions::default(),
    };
    apply_vars(options, lookup)
}

fn apply_vars(
    mut options: FilterOptions,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<FilterOptions, FilterError> {
    if let Some(name) = lookup(ENV_NAME) {
        options.name = name;
    }
    if let Some(value) = lookup(ENV_CAPACITY) {
        options.capacity = parse_var(ENV_CAPACITY, &value)?;
    }
    if let Some(value) = lookup(ENV_ERROR_RATE) {
        options.error_rate = parse_var(ENV_ERROR_RATE, &value)?;
    }
    if let Some(host) = lookup(ENV_HOST) {
        options.store.host = host;
    }
    if let Some(value) = lookup(ENV_PORT) {
        options.store.port = parse_var(ENV_PORT, &value)?;
    }
    if let Some(password) = lookup(ENV_PASSWORD) {
        options.store.password = Some(password);
    }
    if let Some(value) = lookup(ENV_DB) {
        options.store.db = parse_var(ENV_DB, &value)?;
    }
    if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
        options.store.connect_timeout =
            Duration::from_millis(parse_var(ENV_CONNECT_TIMEOUT_MS, &value)?);
    }

    options.validate()?;
    Ok(options)
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, FilterError> {
    value
        .trim()
        .parse()
        .map_err(|_| FilterError::InvalidConfig(format!("{key}: cannot parse {value:?}")))
}
