//! Filter context: one filter over one store connection
//!
//! A context owns its layout (sizing, shard keys, seeds) and the pipeline
//! wrapping its store connection. All operations take `&mut self`: one
//! conversation at a time, because replies are matched to commands by
//! position only. Share a context across tasks through
//! [`FilterHandle`](crate::service::FilterHandle).

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::adapters::RedisStore;
use crate::domain::{FilterConfig, FilterLayout, FilterOptions, StoreOptions};
use crate::error::{FilterError, StoreError};
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{BitStore, StoreCommand, StoreReply};
use crate::service::pipeline::{GroupKind, Pipeline};

/// An open remote Bloom filter
pub struct FilterContext<S: BitStore> {
    layout: FilterLayout,
    pipeline: Pipeline<S>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl FilterContext<RedisStore> {
    /// Connect to the store named in `options` and open the filter
    ///
    /// Connection establishment is bounded by `options.store.connect_timeout`.
    pub fn connect(options: &FilterOptions) -> Result<Self, FilterError> {
        options.validate()?;
        let config = options.filter_config()?;
        let store = RedisStore::connect(&options.store)?;
        Self::open(config, store, &options.store)
    }
}

impl<S: BitStore> FilterContext<S> {
    /// Open a filter over an established store connection
    ///
    /// Authenticates when `store_options` carries a non-empty password and
    /// pings otherwise, then selects the logical database. On any failure
    /// the connection is dropped before the error is returned.
    pub fn open(
        config: FilterConfig,
        store: S,
        store_options: &StoreOptions,
    ) -> Result<Self, FilterError> {
        let layout = FilterLayout::new(config);
        let mut pipeline = Pipeline::new(store);

        if let Err(err) = handshake(&mut pipeline, store_options) {
            warn!(
                filter = %layout.config().name(),
                error = %err,
                "Handshake failed, closing connection"
            );
            drop(pipeline);
            return Err(err);
        }

        info!(
            filter = %layout.config().name(),
            capacity = layout.config().capacity(),
            error_rate = layout.config().error_rate(),
            bits = layout.config().bits(),
            hashes = layout.config().hashes(),
            keys = layout.keys().len(),
            db = store_options.db,
            "Opened remote bloom filter"
        );

        let metrics: Arc<dyn MetricsRecorder> = Arc::new(NoOpMetrics);
        metrics.record_filter_opened(layout.config().bits(), layout.config().hashes());

        Ok(Self {
            layout,
            pipeline,
            metrics,
        })
    }

    /// Install a metrics recorder
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        metrics.record_filter_opened(self.layout.config().bits(), self.layout.config().hashes());
        self.metrics = metrics;
        self
    }

    /// The filter's sizing
    pub fn config(&self) -> &FilterConfig {
        self.layout.config()
    }

    /// Shard key names, in shard order
    pub fn keys(&self) -> &[String] {
        self.layout.keys()
    }

    /// Expected false positive rate once `items` distinct items are stored
    pub fn expected_false_positive_rate(&self, items: u64) -> f64 {
        self.layout.expected_false_positive_rate(items)
    }

    /// Replies issued by deferred operations and not yet drained
    pub fn pending_replies(&self) -> usize {
        self.pipeline.pending_replies()
    }

    /// Add one item, returning `true` if it was not already present
    ///
    /// "Already present" means every probed bit was set before this call,
    /// so a false positive also reports `false`.
    pub fn add(&mut self, item: impl AsRef<[u8]>) -> Result<bool, FilterError> {
        self.pipeline.ensure_idle()?;
        self.add_deferred(item)?;
        Ok(self.add_complete(1)? == 1)
    }

    /// Issue the `SETBIT` commands for `item` without reading replies
    ///
    /// Follow up with [`add_complete`](Self::add_complete) for every item
    /// added this way.
    pub fn add_deferred(&mut self, item: impl AsRef<[u8]>) -> Result<(), FilterError> {
        let commands: Vec<StoreCommand> = self
            .layout
            .probes(item.as_ref())
            .map(|probe| StoreCommand::SetBit {
                key: probe.key.to_string(),
                offset: probe.offset,
            })
            .collect();
        self.pipeline.issue(GroupKind::SetBits, &commands)?;
        Ok(())
    }

    /// Drain the replies of `count` deferred adds
    ///
    /// Returns how many of those items were new. Every group is drained
    /// even when some replies are errors; the first error is returned after.
    pub fn add_complete(&mut self, count: usize) -> Result<u64, FilterError> {
        let available = self.pipeline.leading_groups(GroupKind::SetBits);
        if available < count {
            return Err(StoreError::NoPendingReplies {
                requested: count * self.layout.hashes(),
                pending: available * self.layout.hashes(),
            }
            .into());
        }

        let start = Instant::now();
        let hashes = self.layout.hashes() as i64;
        let mut existing = 0u64;
        let mut failure = None;

        for _ in 0..count {
            let mut replies = self.pipeline.drain_group(GroupKind::SetBits)?;
            if let Some(err) = replies.take_failure() {
                failure.get_or_insert(err);
            }
            if replies.sum() == hashes {
                existing += 1;
            }
        }

        if let Some(err) = failure {
            self.metrics.record_store_error();
            return Err(err.into());
        }

        let added = count as u64 - existing;
        self.metrics.record_add(start.elapsed(), added, existing);
        Ok(added)
    }

    /// Add many items in one pipelined batch, returning how many were new
    pub fn extend<I>(&mut self, items: I) -> Result<u64, FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.pipeline.ensure_idle()?;
        let mut count = 0;
        for item in items {
            self.add_deferred(item)?;
            count += 1;
        }
        self.add_complete(count)
    }

    /// Issue the `GETBIT` commands for `item` without reading replies
    ///
    /// Follow up with [`check_next`](Self::check_next) once per checked item.
    pub fn check(&mut self, item: impl AsRef<[u8]>) -> Result<(), FilterError> {
        let commands: Vec<StoreCommand> = self
            .layout
            .probes(item.as_ref())
            .map(|probe| StoreCommand::GetBit {
                key: probe.key.to_string(),
                offset: probe.offset,
            })
            .collect();
        self.pipeline.issue(GroupKind::GetBits, &commands)?;
        Ok(())
    }

    /// Drain the replies of the oldest pending check
    ///
    /// `true` only if every probed bit is set.
    pub fn check_next(&mut self) -> Result<bool, FilterError> {
        let start = Instant::now();
        let replies = self.pipeline.drain_group(GroupKind::GetBits)?;
        let found = replies.all_set();
        if let Err(err) = replies.into_result() {
            self.metrics.record_store_error();
            return Err(err.into());
        }
        self.metrics.record_check(start.elapsed(), found);
        Ok(found)
    }

    /// Test one item
    pub fn contains(&mut self, item: impl AsRef<[u8]>) -> Result<bool, FilterError> {
        self.pipeline.ensure_idle()?;
        self.check(item)?;
        self.check_next()
    }

    /// Test many items in one pipelined batch, answering in input order
    ///
    /// Every answer is drained even if one fails; the first error wins.
    pub fn contains_many<I>(&mut self, items: I) -> Result<Vec<bool>, FilterError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.pipeline.ensure_idle()?;
        let mut count = 0;
        for item in items {
            self.check(item)?;
            count += 1;
        }

        let mut answers = Vec::with_capacity(count);
        let mut failure = None;
        for _ in 0..count {
            match self.check_next() {
                Ok(found) => answers.push(found),
                Err(FilterError::StoreError(StoreError::Transport(message))) => {
                    return Err(StoreError::Transport(message).into())
                }
                Err(err) => {
                    failure.get_or_insert(err);
                    answers.push(false);
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(answers),
        }
    }

    /// The subset of `items` reported present, in input order
    pub fn intersection<'a, T>(&mut self, items: &'a [T]) -> Result<Vec<&'a T>, FilterError>
    where
        T: AsRef<[u8]>,
    {
        let answers = self.contains_many(items.iter())?;
        Ok(items
            .iter()
            .zip(answers)
            .filter_map(|(item, found)| found.then_some(item))
            .collect())
    }

    /// Delete every shard key of the filter
    ///
    /// Each key is deleted with its own synchronous command. All keys are
    /// attempted; the first failure is returned afterwards.
    pub fn delete(&mut self) -> Result<(), FilterError> {
        self.pipeline.ensure_idle()?;
        let mut failure: Option<StoreError> = None;

        for key in self.layout.keys() {
            let command = StoreCommand::Del { key: key.clone() };
            match self.pipeline.execute(command) {
                Ok(StoreReply::Integer(removed)) => {
                    debug!(key = %key, removed, "Deleted shard key");
                }
                Ok(StoreReply::Error(message)) => {
                    warn!(key = %key, %message, "Shard key delete failed");
                    failure.get_or_insert(StoreError::Reply {
                        position: 0,
                        message,
                    });
                }
                Ok(other) => {
                    failure.get_or_insert(StoreError::UnexpectedReply {
                        position: 0,
                        reply: other.to_string(),
                    });
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Shard key delete failed");
                    failure.get_or_insert(err);
                }
            }
        }

        match failure {
            Some(err) => {
                self.metrics.record_store_error();
                Err(err.into())
            }
            None => {
                self.metrics.record_delete();
                Ok(())
            }
        }
    }

    /// Tear the filter down, releasing the store connection
    ///
    /// Undrained deferred replies are discarded with the connection.
    pub fn close(self) -> S {
        if !self.pipeline.is_idle() {
            warn!(
                filter = %self.layout.config().name(),
                pending = self.pipeline.pending_replies(),
                "Closing filter with undrained replies"
            );
        }
        debug!(filter = %self.layout.config().name(), "Closed remote bloom filter");
        self.pipeline.into_inner()
    }
}

/// Authenticate or ping, then select the database
fn handshake<S: BitStore>(
    pipeline: &mut Pipeline<S>,
    options: &StoreOptions,
) -> Result<(), FilterError> {
    let greeting = match options.credential() {
        Some(password) => StoreCommand::Auth {
            password: password.to_string(),
        },
        None => StoreCommand::Ping,
    };
    expect_success(pipeline, greeting)?;
    expect_success(pipeline, StoreCommand::Select { db: options.db })?;
    Ok(())
}

fn expect_success<S: BitStore>(
    pipeline: &mut Pipeline<S>,
    command: StoreCommand,
) -> Result<(), FilterError> {
    let name = command.name();
    let expected = match command {
        StoreCommand::Ping => "PONG",
        _ => "OK",
    };
    match pipeline.execute(command) {
        Ok(StoreReply::Status(status)) if status == expected => {
            debug!(command = name, %status, "Handshake step succeeded");
            Ok(())
        }
        Ok(StoreReply::Error(message)) => Err(FilterError::ConnectionError(format!(
            "{name} rejected: {message}"
        ))),
        Ok(reply) => Err(FilterError::ConnectionError(format!(
            "{name} got unexpected {reply}, wanted {expected}"
        ))),
        Err(err) => Err(FilterError::ConnectionError(format!("{name} failed: {err}"))),
    }
}
