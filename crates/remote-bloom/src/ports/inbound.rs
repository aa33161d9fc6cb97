//! Inbound Ports (Driving Ports)
//!
//! The API async callers use to drive a shared remote filter.

use async_trait::async_trait;

use crate::error::FilterError;

/// Remote Bloom filter API (Driving Port)
///
/// Every call is one complete conversation with the store: implementations
/// never leave deferred replies behind between calls.
#[async_trait]
pub trait BloomFilterApi: Send + Sync {
    /// Add one item, returning `true` if it was not already present
    async fn add(&self, item: Vec<u8>) -> Result<bool, FilterError>;

    /// Add many items in one pipelined batch
    ///
    /// # Returns
    /// How many of the items were new
    async fn add_many(&self, items: Vec<Vec<u8>>) -> Result<u64, FilterError>;

    /// Test one item
    ///
    /// `false` means definitely absent; `true` means probably present.
    async fn contains(&self, item: Vec<u8>) -> Result<bool, FilterError>;

    /// Test many items in one pipelined batch, answering in input order
    async fn contains_many(&self, items: Vec<Vec<u8>>) -> Result<Vec<bool>, FilterError>;

    /// Delete the filter's contents from the store
    async fn delete(&self) -> Result<(), FilterError>;
}
