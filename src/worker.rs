//! Worker: the dequeue → deserialize → dispatch → retry loop run by each
//! pool member (spec §4.5/§4.6).
//!
//! `WorkerStatus` is tracked as an `AtomicU8`, the donor circuit breaker's
//! state-machine idiom (`STATE_CLOSED`/`STATE_OPEN`/`STATE_HALF_OPEN`)
//! applied to a simpler two-state lifecycle.

use crate::metrics::MetricsCollector;
use crate::queue::SharedQueue;
use crate::registry::HandlerRegistry;
use crate::retry::{RetryEngine, RetryOutcome};
use crate::serializer;
use crate::sleeper::Sleeper;
use crate::telemetry::TelemetrySink;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

const STATUS_IDLE: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_STOPPED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Running,
    Stopped,
}

impl From<u8> for WorkerStatus {
    fn from(v: u8) -> Self {
        match v {
            STATUS_RUNNING => WorkerStatus::Running,
            STATUS_STOPPED => WorkerStatus::Stopped,
            _ => WorkerStatus::Idle,
        }
    }
}

/// Per-worker counters the supervisor reads.
#[derive(Default)]
pub struct WorkerStats {
    pub processed: AtomicU64,
    pub failed: AtomicU64,
    pub dead_lettered: AtomicU64,
    pub dropped: AtomicU64,
}

/// One worker: owns no state the pool doesn't also hold a handle to, so a
/// supervisor restart can simply construct a fresh `Worker` and re-spawn it.
pub struct Worker {
    pub id: usize,
    status: AtomicU8,
    stats: Arc<WorkerStats>,
    queue: Arc<SharedQueue>,
    registry: HandlerRegistry,
    metrics: Arc<MetricsCollector>,
    max_event_size: usize,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<SharedQueue>,
        registry: HandlerRegistry,
        metrics: Arc<MetricsCollector>,
        max_event_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            status: AtomicU8::new(STATUS_IDLE),
            stats: Arc::new(WorkerStats::default()),
            queue,
            registry,
            metrics,
            max_event_size,
            poll_interval,
        }
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.load(Ordering::Acquire).into()
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// Run until `shutdown` (pool-wide stop) or `drain` (this worker's own
    /// scale-down signal) is observed true. Drains all three priority lanes
    /// in strict order on every iteration (spec §4.5); when the queue is
    /// empty, sleeps `poll_interval` before polling again rather than
    /// busy-spinning.
    pub async fn run<S: TelemetrySink>(
        &self,
        sleeper: Arc<dyn Sleeper>,
        retry_engine: Arc<RetryEngine<S>>,
        shutdown: Arc<AtomicBool>,
        drain: Arc<AtomicBool>,
    ) {
        self.status.store(STATUS_RUNNING, Ordering::Release);

        while !shutdown.load(Ordering::Acquire) && !drain.load(Ordering::Acquire) {
            match self.queue.dequeue() {
                Some(bytes) => {
                    self.dispatch_one(bytes, &retry_engine).await;
                }
                None => {
                    sleeper.sleep(self.poll_interval).await;
                }
            }
        }

        // Drain remaining work before reporting stopped (spec §4.7 graceful
        // shutdown; also how scale-down finishes in-flight work, spec §4.6).
        while let Some(bytes) = self.queue.dequeue() {
            self.dispatch_one(bytes, &retry_engine).await;
        }

        self.status.store(STATUS_STOPPED, Ordering::Release);
    }

    async fn dispatch_one<S: TelemetrySink>(&self, bytes: Vec<u8>, retry_engine: &Arc<RetryEngine<S>>) {
        let event = match serializer::decode(&bytes, self.max_event_size) {
            Ok(event) => event,
            Err(err) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_dropped();
                tracing::warn!(error = %err, worker_id = self.id, "dropping malformed event");
                return;
            }
        };

        let Some(handler) = self.registry.get(&event.event_type) else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_dropped();
            tracing::warn!(
                event_type = %event.event_type,
                worker_id = self.id,
                "dropping event with no registered handler"
            );
            return;
        };

        match retry_engine.run(event, handler).await {
            RetryOutcome::Succeeded => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
            }
            RetryOutcome::Retrying => {
                // Re-enqueued by the retry engine; this attempt is not yet resolved.
            }
            RetryOutcome::DeadLettered => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                self.stats.dead_lettered.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
