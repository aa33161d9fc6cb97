//! Service Layer
//!
//! Orchestrates the domain layout over a bit store connection:
//! - `pipeline` - two-phase command issue and reply draining
//! - `context` - one open filter (add, check, delete)
//! - `handle` - async handle serializing callers onto one context

pub mod context;
pub mod handle;
pub mod pipeline;

pub use context::FilterContext;
pub use handle::FilterHandle;
pub use pipeline::{GroupKind, GroupReplies, Pipeline};
