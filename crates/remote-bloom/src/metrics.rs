//! Metrics hooks for remote filter operations
//!
//! Counters for opened filters, adds, checks, deletes and store failures.
//! Recording is a few relaxed atomic increments; nothing here touches the
//! store.
//!
//! ## Usage
//!
//! ```ignore
//! use remote_bloom::metrics::Metrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(Metrics::new());
//! let mut filter = FilterContext::connect(&options)?.with_metrics(metrics.clone());
//!
//! filter.add(b"item")?;
//! println!("{:?}", metrics.snapshot());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector for remote filter operations
#[derive(Default)]
pub struct Metrics {
    /// Filters opened with this recorder
    pub filters_opened: AtomicU64,
    /// Total bits across opened filters
    pub bits_allocated: AtomicU64,
    /// Items reported new by add operations
    pub items_added: AtomicU64,
    /// Items reported already present by add operations
    pub items_existing: AtomicU64,
    /// Completed add batches (a single add is a batch of one)
    pub add_batches: AtomicU64,
    /// Membership checks answered
    pub checks_performed: AtomicU64,
    /// Checks answered "probably present"
    pub checks_positive: AtomicU64,
    /// Filter deletions
    pub deletes: AtomicU64,
    /// Operations failed by the store
    pub store_errors: AtomicU64,
    /// Cumulative add drain time in nanoseconds
    pub add_time_ns: AtomicU64,
    /// Cumulative check drain time in nanoseconds
    pub check_time_ns: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a filter being opened with `bits` bits and `hashes` rounds
    pub fn record_filter_opened(&self, bits: u64, _hashes: u32) {
        self.filters_opened.fetch_add(1, Ordering::Relaxed);
        self.bits_allocated.fetch_add(bits, Ordering::Relaxed);
    }

    /// Record a completed add batch
    pub fn record_add(&self, duration: Duration, added: u64, existing: u64) {
        self.add_batches.fetch_add(1, Ordering::Relaxed);
        self.items_added.fetch_add(added, Ordering::Relaxed);
        self.items_existing.fetch_add(existing, Ordering::Relaxed);
        self.add_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record one answered check
    pub fn record_check(&self, duration: Duration, found: bool) {
        self.checks_performed.fetch_add(1, Ordering::Relaxed);
        self.check_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        if found {
            self.checks_positive.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            filters_opened: self.filters_opened.load(Ordering::Relaxed),
            bits_allocated: self.bits_allocated.load(Ordering::Relaxed),
            items_added: self.items_added.load(Ordering::Relaxed),
            items_existing: self.items_existing.load(Ordering::Relaxed),
            checks_performed: self.checks_performed.load(Ordering::Relaxed),
            checks_positive: self.checks_positive.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            avg_add_batch_ns: self.avg_add_batch_time_ns(),
            avg_check_ns: self.avg_check_time_ns(),
        }
    }

    /// Average drain time per add batch in nanoseconds
    pub fn avg_add_batch_time_ns(&self) -> u64 {
        let total = self.add_time_ns.load(Ordering::Relaxed);
        let count = self.add_batches.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    /// Average drain time per check in nanoseconds
    pub fn avg_check_time_ns(&self) -> u64 {
        let total = self.check_time_ns.load(Ordering::Relaxed);
        let count = self.checks_performed.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    /// Share of checks answered "probably present"
    ///
    /// Includes true positives as well as false positives.
    pub fn observed_positive_rate(&self) -> f64 {
        let total = self.checks_performed.load(Ordering::Relaxed);
        let positive = self.checks_positive.load(Ordering::Relaxed);
        if total > 0 {
            positive as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.filters_opened,
            &self.bits_allocated,
            &self.items_added,
            &self.items_existing,
            &self.add_batches,
            &self.checks_performed,
            &self.checks_positive,
            &self.deletes,
            &self.store_errors,
            &self.add_time_ns,
            &self.check_time_ns,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    pub filters_opened: u64,
    pub bits_allocated: u64,
    pub items_added: u64,
    pub items_existing: u64,
    pub checks_performed: u64,
    pub checks_positive: u64,
    pub deletes: u64,
    pub store_errors: u64,
    pub avg_add_batch_ns: u64,
    pub avg_check_ns: u64,
}

/// Trait for custom metrics recording implementations
///
/// Implement this to forward filter activity to an external metrics system.
pub trait MetricsRecorder: Send + Sync {
    fn record_filter_opened(&self, bits: u64, hashes: u32);

    fn record_add(&self, duration: Duration, added: u64, existing: u64);

    fn record_check(&self, duration: Duration, found: bool);

    fn record_delete(&self);

    fn record_store_error(&self);
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_filter_opened(&self, _: u64, _: u32) {}
    fn record_add(&self, _: Duration, _: u64, _: u64) {}
    fn record_check(&self, _: Duration, _: bool) {}
    fn record_delete(&self) {}
    fn record_store_error(&self) {}
}

impl MetricsRecorder for Metrics {
    fn record_filter_opened(&self, bits: u64, hashes: u32) {
        Metrics::record_filter_opened(self, bits, hashes);
    }

    fn record_add(&self, duration: Duration, added: u64, existing: u64) {
        Metrics::record_add(self, duration, added, existing);
    }

    fn record_check(&self, duration: Duration, found: bool) {
        Metrics::record_check(self, duration, found);
    }

    fn record_delete(&self) {
        Metrics::record_delete(self);
    }

    fn record_store_error(&self) {
        Metrics::record_store_error(self);
    }
}
