//! Error types for the remote Bloom filter

use thiserror::Error;

use crate::service::pipeline::GroupKind;

/// Errors surfaced to filter callers
///
/// Every failure falls into one of three kinds, see [`ErrorKind`].
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid filter configuration: {0}")]
    InvalidConfig(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

/// Coarse classification of a [`FilterError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad capacity, error rate, or name; no filter was created
    InvalidConfig,
    /// Transport, authentication, or database selection failed while opening
    Connection,
    /// A store command failed or the reply stream broke
    Store,
}

impl FilterError {
    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FilterError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            FilterError::ConnectionError(_) => ErrorKind::Connection,
            FilterError::StoreError(_) => ErrorKind::Store,
        }
    }
}

/// Errors from the bit store port
#[derive(Debug, Error)]
pub enum StoreError {
    /// The connection failed; no further replies can be read from it.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store replied with an error at position {position}: {message}")]
    Reply { position: usize, message: String },

    #[error("Unexpected reply at position {position}: {reply}")]
    UnexpectedReply { position: usize, reply: String },

    #[error("No pending replies: requested {requested}, pending {pending}")]
    NoPendingReplies { requested: usize, pending: usize },

    #[error("Reply stream out of sequence: expected {expected:?} group, found {found:?}")]
    OutOfSequence { expected: GroupKind, found: GroupKind },

    #[error("Pipeline busy: {pending} deferred replies not yet drained")]
    Busy { pending: usize },
}
