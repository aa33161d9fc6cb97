//! Adapters Layer (Driven Adapters)
//!
//! Implementations of the bit store port, plus configuration loading.
//!
//! ## Adapters
//!
//! - `RedisStore` - a Redis connection speaking the bit store protocol
//! - `MemoryStore` - in-process store with fault injection for tests
//! - `config` - options from TOML files and environment variables

pub mod config;
pub mod memory;
pub mod redis_store;

pub use memory::{MemoryBackend, MemoryStore};
pub use redis_store::RedisStore;
