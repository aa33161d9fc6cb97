//! Per-filter layout: sizing, shard keys and hash seeds
//!
//! Everything here is computed once when a filter is opened and never
//! changes afterwards.

use super::addressing::{BitAddress, ShardKeys};
use super::config::FilterConfig;
use super::hash_functions::{bit_index, generate_seeds};
use super::parameters::calculate_fpr;

/// One bit to set or read for an item
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe<'a> {
    /// Shard key holding the bit
    pub key: &'a str,
    /// Offset of the bit within the key
    pub offset: u64,
}

/// Immutable description of where a filter's bits live
#[derive(Clone, Debug)]
pub struct FilterLayout {
    config: FilterConfig,
    keys: ShardKeys,
    seeds: Vec<u32>,
}

impl FilterLayout {
    /// Build the layout for a validated configuration
    pub fn new(config: FilterConfig) -> Self {
        let keys = ShardKeys::new(config.name(), config.bits());
        let seeds = generate_seeds(config.hashes());
        Self {
            config,
            keys,
            seeds,
        }
    }

    /// The filter's sizing
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Shard key names, in shard order
    pub fn keys(&self) -> &[String] {
        self.keys.as_slice()
    }

    /// Hash seeds, one per hash round
    pub fn seeds(&self) -> &[u32] {
        &self.seeds
    }

    /// Hash rounds per item
    pub fn hashes(&self) -> usize {
        self.seeds.len()
    }

    /// The bits probed for `item`, one per hash round, in seed order
    pub fn probes<'a>(&'a self, item: &'a [u8]) -> impl Iterator<Item = Probe<'a>> + 'a {
        let bits = self.config.bits();
        self.seeds.iter().map(move |&seed| {
            let address = BitAddress::locate(bit_index(item, seed, bits));
            Probe {
                key: self.keys.key_for(&address),
                offset: address.offset,
            }
        })
    }

    /// Expected false positive rate once `items` distinct items are stored
    pub fn expected_false_positive_rate(&self, items: u64) -> f64 {
        calculate_fpr(self.config.bits(), items, self.config.hashes())
    }
}
