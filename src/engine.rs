//! `Engine`: the top-level facade wiring queue, registry, retry engine,
//! worker pool, supervisor, metrics, and health evaluator together (spec
//! §2/§4 top-level lifecycle: `initialize` → `emit`/`registerHandler` →
//! `shutdown`).

use crate::clock::{Clock, MonotonicClock};
use crate::config::EngineConfig;
use crate::dlq::DeadLetterQueue;
use crate::emitter::Emitter;
use crate::error::EngineError;
use crate::event::Event;
use crate::health::{HealthEvaluator, HealthReport};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::pool::WorkerPool;
use crate::queue::SharedQueue;
use crate::registry::{EventHandler, HandlerRegistry};
use crate::retry::RetryEngine;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::supervisor::PoolSupervisor;
use crate::telemetry::{NullSink, TelemetrySink};
use std::sync::Arc;
use std::time::Duration;

/// The engine with the default (discarding) telemetry sink. Most callers
/// that don't need a custom sink should use this alias.
pub type DefaultEngine = Engine<NullSink>;

pub struct Engine<S: TelemetrySink> {
    config: EngineConfig,
    registry: HandlerRegistry,
    queue: Arc<SharedQueue>,
    dlq: Arc<DeadLetterQueue>,
    metrics: Arc<MetricsCollector>,
    health: HealthEvaluator,
    emitter: Arc<Emitter<S>>,
    supervisor: Arc<PoolSupervisor<S>>,
    clock: Arc<dyn Clock>,
}

impl Engine<NullSink> {
    /// Build and initialize an engine with the discarding telemetry sink.
    pub async fn start(config: EngineConfig) -> Result<Self, EngineError> {
        Self::start_with_sink(config, NullSink).await
    }
}

impl<S: TelemetrySink> Engine<S> {
    /// Build and initialize an engine with a custom telemetry sink,
    /// spawning its worker pool and supervisor sweep loop immediately
    /// (spec §2: `initialize()` brings the engine fully up before
    /// returning).
    pub async fn start_with_sink(config: EngineConfig, sink: S) -> Result<Self, EngineError> {
        let queue = Arc::new(SharedQueue::new(config.max_queue_size, config.max_event_size));
        let registry = HandlerRegistry::new();
        let dlq = Arc::new(DeadLetterQueue::new(config.dlq_max_size, config.dlq_overflow_policy));
        let metrics = Arc::new(MetricsCollector::new());
        let health =
            HealthEvaluator::new(config.max_queue_size, config.max_event_size, config.max_memory_bytes);
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::default());
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

        let retry_engine = Arc::new(RetryEngine::new(
            &config,
            sleeper.clone(),
            dlq.clone(),
            queue.clone(),
            metrics.clone(),
            sink.clone(),
        ));

        let pool = WorkerPool::new(
            queue.clone(),
            registry.clone(),
            sleeper.clone(),
            retry_engine.clone(),
            metrics.clone(),
            config.max_event_size,
            config.worker_poll_interval,
        );

        let supervisor = Arc::new(PoolSupervisor::new(
            pool,
            config.worker_restart_threshold,
            config.worker_restart_base_delay,
            sleeper.clone(),
            sink.clone(),
            config.health_check_interval,
            clock.clone(),
        ));
        supervisor.scale_to(config.worker_count);

        let emitter = Arc::new(Emitter::new(
            config.clone(),
            queue.clone(),
            registry.clone(),
            retry_engine,
            metrics.clone(),
            sink.clone(),
        ));
        emitter.mark_initialized();

        {
            let supervisor = supervisor.clone();
            let sweep_interval = config.health_check_interval;
            tokio::spawn(async move {
                loop {
                    supervisor.sweep().await;
                    tokio::time::sleep(sweep_interval).await;
                }
            });
        }

        {
            let supervisor = supervisor.clone();
            let metrics = metrics.clone();
            let queue = queue.clone();
            let health = health.clone();
            let sink = sink.clone();
            let interval = config.health_check_interval;
            tokio::spawn(async move {
                let mut last_recommendation: Option<&'static str> = None;
                loop {
                    tokio::time::sleep(interval).await;
                    let snapshot = metrics.snapshot(queue.len());
                    let (total, failed) = supervisor.worker_health();
                    let report = health.evaluate(&snapshot, total, failed);
                    if last_recommendation != Some(report.recommendation) {
                        last_recommendation = Some(report.recommendation);
                        crate::telemetry::emit_best_effort(
                            sink.clone(),
                            crate::telemetry::EngineEvent::HealthChanged {
                                healthy: report.healthy,
                                summary: format!(
                                    "score={:.2} recommendation={}",
                                    report.score, report.recommendation
                                ),
                            },
                        )
                        .await;
                    }
                }
            });
        }

        {
            let metrics = metrics.clone();
            let queue = queue.clone();
            let interval = config.metrics_interval;
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    let snap = metrics.snapshot(queue.len());
                    tracing::debug!(
                        enqueued = snap.enqueued,
                        processed = snap.processed,
                        failed = snap.failed,
                        dead_lettered = snap.dead_lettered,
                        dropped = snap.dropped,
                        retried = snap.retried,
                        queue_depth = snap.queue_depth,
                        "periodic metrics snapshot"
                    );
                }
            });
        }

        Ok(Self { config, registry, queue, dlq, metrics, health, emitter, supervisor, clock })
    }

    pub fn register_handler(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.registry.register(event_type, handler);
    }

    pub fn unregister_handler(&self, event_type: &str) -> bool {
        self.registry.unregister(event_type)
    }

    pub async fn emit(&self, event: Event) -> Result<(), EngineError> {
        self.emitter.emit(event).await
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.queue.len())
    }

    pub fn health(&self) -> HealthReport {
        let (total, failed) = self.supervisor.worker_health();
        self.health.evaluate(&self.metrics_snapshot(), total, failed)
    }

    pub fn scale_to(&self, target_workers: usize) {
        self.supervisor.scale_to(target_workers);
    }

    pub fn worker_count(&self) -> usize {
        self.supervisor.worker_count()
    }

    pub fn dlq_len(&self) -> usize {
        self.dlq.len()
    }

    pub fn uptime(&self) -> Duration {
        Duration::from_millis(self.clock.now_millis())
    }

    /// Stop admitting new events, drain the queue, and await worker
    /// completion within `config.graceful_shutdown_timeout` (spec §4.7).
    pub async fn shutdown(self) -> bool {
        self.emitter.begin_draining();
        let timeout = self.config.graceful_shutdown_timeout;
        Arc::try_unwrap(self.supervisor)
            .map(|supervisor| supervisor.shutdown(timeout))
            .unwrap_or_else(|_| Box::pin(async { false }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Priority;
    use crate::registry::FnHandler;

    async fn started() -> Engine<NullSink> {
        let config = EngineConfig::builder().worker_count(2).build().unwrap();
        let engine = Engine::start(config).await.unwrap();
        engine.register_handler("t", Arc::new(FnHandler::new(|_: &[u8]| async { Ok(()) })));
        engine
    }

    #[tokio::test]
    async fn initialize_spawns_configured_worker_count() {
        let engine = started().await;
        assert_eq!(engine.worker_count(), 2);
    }

    #[tokio::test]
    async fn emit_then_metrics_reflect_processed_event() {
        let engine = started().await;
        engine.emit(Event::new("t", vec![1], Priority::Critical)).await.unwrap();

        // Give the worker pool a moment to drain the queue.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = engine.metrics_snapshot();
        assert_eq!(snap.processed, 1);
    }

    #[tokio::test]
    async fn health_is_nominal_on_a_fresh_engine() {
        let engine = started().await;
        let report = engine.health();
        assert!(report.healthy);
    }

    #[tokio::test]
    async fn shutdown_drains_in_flight_work() {
        let engine = started().await;
        engine.emit(Event::new("t", vec![], Priority::Normal)).await.unwrap();
        let ok = engine.shutdown().await;
        assert!(ok);
    }

    #[tokio::test]
    async fn unregister_handler_drops_events_at_dequeue_instead_of_at_emit() {
        let engine = started().await;
        assert!(engine.unregister_handler("t"));

        // Admission no longer checks handler registration (spec: that's a
        // dequeue-time lookup so a late-registering handler still works).
        engine.emit(Event::new("t", vec![], Priority::Normal)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let snap = engine.metrics_snapshot();
        assert_eq!(snap.dropped, 1);
        assert_eq!(engine.dlq_len(), 0);
    }
}
