//! Mapping of the logical bit array onto store keys
//!
//! A single store key addresses at most [`MAX_BITS_PER_KEY`] bits, so a
//! filter's bit array is split across consecutive shard keys named
//! `"<name>.<index>"`. Shard `i` covers
//! `[i * MAX_BITS_PER_KEY, min((i + 1) * MAX_BITS_PER_KEY, bits))`.

/// Largest number of bits addressed through one store key
pub const MAX_BITS_PER_KEY: u64 = u32::MAX as u64;

/// Location of one logical bit in the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitAddress {
    /// Index into the shard key set
    pub shard: usize,
    /// Bit offset within that shard's key
    pub offset: u64,
}

impl BitAddress {
    /// Locate logical bit `index`
    pub fn locate(index: u64) -> Self {
        Self {
            shard: (index / MAX_BITS_PER_KEY) as usize,
            offset: index % MAX_BITS_PER_KEY,
        }
    }

    /// The logical bit index this address stands for
    pub fn index(&self) -> u64 {
        self.shard as u64 * MAX_BITS_PER_KEY + self.offset
    }
}

/// Number of shard keys needed for `bits` bits
pub fn shard_count(bits: u64) -> usize {
    bits.div_ceil(MAX_BITS_PER_KEY) as usize
}

/// Ordered shard key names of one filter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardKeys {
    keys: Vec<String>,
}

impl ShardKeys {
    /// Derive the shard key names for a filter called `name` with `bits` bits
    pub fn new(name: &str, bits: u64) -> Self {
        let keys = (0..shard_count(bits))
            .map(|index| format!("{name}.{index}"))
            .collect();
        Self { keys }
    }

    /// Key holding the bit at `address`
    ///
    /// # Panics
    ///
    /// If `address` lies beyond the filter's bit count. Addresses produced
    /// by [`BitAddress::locate`] for an index below it always resolve.
    pub fn key_for(&self, address: &BitAddress) -> &str {
        &self.keys[address.shard]
    }

    /// All shard keys, in shard order
    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }
}
