//! # Remote Bloom
//!
//! A Bloom filter whose bit array lives in a Redis-compatible remote store,
//! so any number of processes can share one filter.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `calculate_optimal_parameters`: sizing from capacity and error rate
//!   - `murmur_hash64a` / `generate_seeds`: the hash family
//!   - `BitAddress` / `ShardKeys`: bit index to (key, offset)
//!   - `FilterConfig`, `FilterOptions`, `FilterOptionsBuilder`
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `BitStore`: Driven port (the remote store connection)
//!   - `BloomFilterApi`: Driving port (async callers)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `Pipeline`: two-phase command issue and ordered reply draining
//!   - `FilterContext`: one open filter
//!   - `FilterHandle`: implements `BloomFilterApi` over a single worker
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `RedisStore`, `MemoryStore`, config loading
//!
//! ## Invariants
//!
//! - No false negatives: once an add succeeds, every check of that item
//!   returns true until the filter is deleted
//! - Sizing, seeds and shard keys depend only on (name, capacity,
//!   error rate), so every process computes the same layout
//!
//! ## Usage Example
//!
//! ```no_run
//! use remote_bloom::{FilterContext, FilterOptionsBuilder};
//!
//! # fn main() -> Result<(), remote_bloom::FilterError> {
//! let options = FilterOptionsBuilder::new("signups")
//!     .capacity(1_000_000)
//!     .error_rate(0.001)
//!     .build()?;
//!
//! let mut filter = FilterContext::connect(&options)?;
//! filter.add(b"alice@example.com")?;
//! assert!(filter.contains(b"alice@example.com")?);
//!
//! // Pipelined batch: issue everything, then drain once
//! for email in ["bob@example.com", "carol@example.com"] {
//!     filter.add_deferred(email)?;
//! }
//! let new_items = filter.add_complete(2)?;
//! # let _ = new_items;
//! filter.close();
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{MemoryBackend, MemoryStore, RedisStore};
pub use domain::{FilterConfig, FilterOptions, FilterOptionsBuilder, StoreOptions};
pub use error::{ErrorKind, FilterError, StoreError};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{BitStore, BloomFilterApi, StoreCommand, StoreReply};
pub use service::{FilterContext, FilterHandle};
