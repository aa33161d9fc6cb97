//! Domain Layer - Pure filter logic
//!
//! This layer contains:
//! - Sizing calculation
//! - Hash family (MurmurHash64A + LCG seeds)
//! - Bit addressing across shard keys
//! - Configuration
//! - Per-filter layout
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod addressing;
pub mod config;
pub mod hash_functions;
pub mod layout;
pub mod parameters;

pub use addressing::{BitAddress, ShardKeys, MAX_BITS_PER_KEY};
pub use config::{FilterConfig, FilterOptions, FilterOptionsBuilder, StoreOptions};
pub use hash_functions::{bit_index, generate_seeds, murmur_hash64a};
pub use layout::{FilterLayout, Probe};
pub use parameters::{calculate_fpr, calculate_optimal_parameters, BloomFilterParams};
