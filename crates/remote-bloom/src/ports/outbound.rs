//! Outbound Ports (Driven Ports)
//!
//! The bit store a filter lives in. Implementations wrap one already
//! established connection: `send` writes commands without waiting, and
//! `receive` returns replies strictly in the order their commands were sent.
//! Nothing correlates a reply with its command except that order.

use std::fmt;

use crate::error::StoreError;

/// A command understood by the bit store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCommand {
    /// `AUTH password`
    Auth { password: String },
    /// `PING`
    Ping,
    /// `SELECT db`
    Select { db: i64 },
    /// `SETBIT key offset 1`; replies with the previous bit value
    SetBit { key: String, offset: u64 },
    /// `GETBIT key offset`; replies with the current bit value
    GetBit { key: String, offset: u64 },
    /// `DEL key`; replies with the number of keys removed
    Del { key: String },
}

impl StoreCommand {
    /// Command name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            StoreCommand::Auth { .. } => "AUTH",
            StoreCommand::Ping => "PING",
            StoreCommand::Select { .. } => "SELECT",
            StoreCommand::SetBit { .. } => "SETBIT",
            StoreCommand::GetBit { .. } => "GETBIT",
            StoreCommand::Del { .. } => "DEL",
        }
    }
}

/// A single reply read back from the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreReply {
    /// Integer reply (bit values, deleted-key counts)
    Integer(i64),
    /// Status reply such as `OK` or `PONG`
    Status(String),
    /// Error reply; the connection stays usable
    Error(String),
    /// Null reply
    Nil,
    /// Any other reply shape
    Other(String),
}

impl fmt::Display for StoreReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreReply::Integer(value) => write!(f, "integer {value}"),
            StoreReply::Status(status) => write!(f, "status {status}"),
            StoreReply::Error(message) => write!(f, "error {message}"),
            StoreReply::Nil => write!(f, "nil"),
            StoreReply::Other(description) => write!(f, "{description}"),
        }
    }
}

/// Bit store connection (Driven Port)
///
/// Error replies are values (`StoreReply::Error`), not `Err`: an `Err`
/// from either method means the connection itself failed.
pub trait BitStore {
    /// Write `commands` to the store without reading any reply
    fn send(&mut self, commands: &[StoreCommand]) -> Result<(), StoreError>;

    /// Read the next reply
    fn receive(&mut self) -> Result<StoreReply, StoreError>;
}

impl<S: BitStore + ?Sized> BitStore for Box<S> {
    fn send(&mut self, commands: &[StoreCommand]) -> Result<(), StoreError> {
        (**self).send(commands)
    }

    fn receive(&mut self) -> Result<StoreReply, StoreError> {
        (**self).receive()
    }
}
