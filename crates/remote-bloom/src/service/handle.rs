//! Async handle to a filter owned by a single worker
//!
//! A [`FilterContext`] must never run two conversations at once. The handle
//! serializes callers through a channel: one worker thread owns the
//! context and answers each request over a oneshot before taking the next.
//! The worker is a plain OS thread, not a runtime task, so it never holds up
//! runtime shutdown and the handle works from any runtime.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use std::thread;

use crate::error::FilterError;
use crate::ports::{BitStore, BloomFilterApi};
use crate::service::context::FilterContext;

/// Requests queued before callers start waiting on the worker
const REQUEST_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, FilterError>>;

enum Request {
    Add(Vec<u8>, Reply<bool>),
    AddMany(Vec<Vec<u8>>, Reply<u64>),
    Contains(Vec<u8>, Reply<bool>),
    ContainsMany(Vec<Vec<u8>>, Reply<Vec<bool>>),
    Delete(Reply<()>),
}

/// Cloneable async handle to one remote filter
///
/// The worker stops, and the store connection is closed, once every clone
/// of the handle has been dropped.
#[derive(Clone)]
pub struct FilterHandle {
    sender: mpsc::Sender<Request>,
}

impl FilterHandle {
    /// Move `context` onto its own worker thread and return a handle to it
    ///
    /// The worker runs until the last handle is dropped.
    pub fn spawn<S>(context: FilterContext<S>) -> Result<Self, FilterError>
    where
        S: BitStore + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        thread::Builder::new()
            .name("remote-bloom-worker".to_string())
            .spawn(move || run_worker(context, receiver))
            .map_err(|e| {
                FilterError::ConnectionError(format!("cannot start filter worker: {e}"))
            })?;
        Ok(Self { sender })
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, FilterError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(request(reply))
            .await
            .map_err(|_| worker_stopped())?;
        response.await.map_err(|_| worker_stopped())?
    }
}

fn worker_stopped() -> FilterError {
    FilterError::ConnectionError("filter worker has stopped".to_string())
}

fn run_worker<S: BitStore>(mut context: FilterContext<S>, mut receiver: mpsc::Receiver<Request>) {
    info!(filter = %context.config().name(), "Filter worker started");

    while let Some(request) = receiver.blocking_recv() {
        // A caller that gave up waiting has dropped its receiver; the
        // operation still ran, so the failed send is ignored.
        match request {
            Request::Add(item, reply) => {
                let _ = reply.send(context.add(&item));
            }
            Request::AddMany(items, reply) => {
                let _ = reply.send(context.extend(&items));
            }
            Request::Contains(item, reply) => {
                let _ = reply.send(context.contains(&item));
            }
            Request::ContainsMany(items, reply) => {
                let _ = reply.send(context.contains_many(&items));
            }
            Request::Delete(reply) => {
                let _ = reply.send(context.delete());
            }
        }
    }

    debug!(filter = %context.config().name(), "All handles dropped, closing filter");
    context.close();
}

#[async_trait]
impl BloomFilterApi for FilterHandle {
    async fn add(&self, item: Vec<u8>) -> Result<bool, FilterError> {
        self.call(|reply| Request::Add(item, reply)).await
    }

    async fn add_many(&self, items: Vec<Vec<u8>>) -> Result<u64, FilterError> {
        self.call(|reply| Request::AddMany(items, reply)).await
    }

    async fn contains(&self, item: Vec<u8>) -> Result<bool, FilterError> {
        self.call(|reply| Request::Contains(item, reply)).await
    }

    async fn contains_many(&self, items: Vec<Vec<u8>>) -> Result<Vec<bool>, FilterError> {
        self.call(|reply| Request::ContainsMany(items, reply)).await
    }

    async fn delete(&self) -> Result<(), FilterError> {
        self.call(Request::Delete).await
    }
}
