//! Metrics collector: atomic counters plus a bounded latency histogram,
//! with derived rates computed at snapshot time (spec §4.8).
//!
//! Counters follow the donor circuit breaker's `AtomicU64` accounting
//! style; the latency distribution uses `hdrhistogram`, already in the
//! donor's dependency graph for benchmark-facing percentile reporting.

use crate::event::Priority;
use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Point-in-time snapshot of engine metrics, returned by `MetricsCollector::snapshot`.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Sum of the three per-priority counters below.
    pub enqueued: u64,
    pub enqueued_critical: u64,
    pub enqueued_normal: u64,
    pub enqueued_low: u64,
    pub processed: u64,
    pub failed: u64,
    pub dead_lettered: u64,
    pub retried: u64,
    pub fallback_to_sync: u64,
    /// Admission-rejected or no-handler events; distinct from `dead_lettered`
    /// (spec §4.8's `eventsDropped`, never conflated with `deadLetterCount`).
    pub dropped: u64,
    pub queue_depth: usize,
    pub throughput_per_sec: f64,
    pub error_rate: f64,
    pub latency_p50_micros: u64,
    pub latency_p99_micros: u64,
    pub uptime: Duration,
}

/// Accumulates counts and latencies; cheap to update from any worker or
/// the emitter front-end, since every field is either an atomic or a
/// briefly-locked histogram.
pub struct MetricsCollector {
    enqueued_critical: AtomicU64,
    enqueued_normal: AtomicU64,
    enqueued_low: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    dead_lettered: AtomicU64,
    retried: AtomicU64,
    fallback_to_sync: AtomicU64,
    dropped: AtomicU64,
    latency: Mutex<Histogram<u64>>,
    started_at: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            enqueued_critical: AtomicU64::new(0),
            enqueued_normal: AtomicU64::new(0),
            enqueued_low: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dead_lettered: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            fallback_to_sync: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            // 3 significant figures is ample for sub-second handler latencies
            // and keeps the bucket count bounded regardless of sample count.
            latency: Mutex::new(Histogram::new(3).expect("valid histogram precision")),
            started_at: Instant::now(),
        }
    }

    pub fn record_enqueued(&self, priority: Priority) {
        let counter = match priority {
            Priority::Critical => &self.enqueued_critical,
            Priority::Normal => &self.enqueued_normal,
            Priority::Low => &self.enqueued_low,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self, latency: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_to_sync(&self) {
        self.fallback_to_sync.fetch_add(1, Ordering::Relaxed);
    }

    /// An event was rejected at admission (queue full, fallback disabled)
    /// or dropped at dequeue for lack of a registered handler.
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency: Duration) {
        let micros = latency.as_micros().min(u64::MAX as u128) as u64;
        let mut hist = self.latency.lock().unwrap_or_else(|p| p.into_inner());
        let _ = hist.record(micros.max(1));
    }

    /// Compute a snapshot. `queue_depth` is read from the queue at call
    /// time since the collector itself holds no reference to it.
    pub fn snapshot(&self, queue_depth: usize) -> MetricsSnapshot {
        let enqueued_critical = self.enqueued_critical.load(Ordering::Relaxed);
        let enqueued_normal = self.enqueued_normal.load(Ordering::Relaxed);
        let enqueued_low = self.enqueued_low.load(Ordering::Relaxed);
        let enqueued = enqueued_critical + enqueued_normal + enqueued_low;
        let processed = self.processed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let dead_lettered = self.dead_lettered.load(Ordering::Relaxed);
        let retried = self.retried.load(Ordering::Relaxed);
        let fallback_to_sync = self.fallback_to_sync.load(Ordering::Relaxed);
        let dropped = self.dropped.load(Ordering::Relaxed);
        let uptime = self.started_at.elapsed();

        let completed = processed + failed;
        let error_rate = if completed == 0 { 0.0 } else { failed as f64 / completed as f64 };
        let throughput_per_sec = if uptime.as_secs_f64() > 0.0 {
            processed as f64 / uptime.as_secs_f64()
        } else {
            0.0
        };

        let hist = self.latency.lock().unwrap_or_else(|p| p.into_inner());
        let latency_p50_micros = hist.value_at_quantile(0.50);
        let latency_p99_micros = hist.value_at_quantile(0.99);

        MetricsSnapshot {
            enqueued,
            enqueued_critical,
            enqueued_normal,
            enqueued_low,
            processed,
            failed,
            dead_lettered,
            retried,
            fallback_to_sync,
            dropped,
            queue_depth,
            throughput_per_sec,
            error_rate,
            latency_p50_micros,
            latency_p99_micros,
            uptime,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
