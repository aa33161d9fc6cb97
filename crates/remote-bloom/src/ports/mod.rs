//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - async API for callers sharing a filter
//! - Driven Ports (outbound) - the remote bit store

pub mod inbound;
pub mod outbound;

pub use inbound::BloomFilterApi;
pub use outbound::{BitStore, StoreCommand, StoreReply};
