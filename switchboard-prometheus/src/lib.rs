//! Prometheus metrics sink for `switchboard`.
//! Bring your own `prometheus::Registry`; counters are registered and incremented.

use prometheus::{IntCounterVec, IntGauge, Registry};
use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::Arc;
use std::task::{Context, Poll};
use switchboard::{EngineEvent, TelemetrySink};

#[derive(Clone, Debug)]
pub struct PrometheusSink {
    registry: Arc<Registry>,
    events: IntCounterVec,
    dead_lettered: IntCounterVec,
    worker_restarts: IntCounterVec,
    healthy: IntGauge,
}

impl PrometheusSink {
    /// Create a sink and register its metrics into the provided registry.
    ///
    /// # Errors
    /// Returns an error if a metric cannot be registered (e.g. name conflict).
    pub fn new<R: Into<Arc<Registry>>>(registry: R) -> Result<Self, prometheus::Error> {
        let registry = registry.into();

        let events = IntCounterVec::new(
            prometheus::Opts::new("switchboard_events_total", "Event bus lifecycle events"),
            &["kind"],
        )?;
        registry.register(Box::new(events.clone()))?;

        let dead_lettered = IntCounterVec::new(
            prometheus::Opts::new(
                "switchboard_dead_lettered_total",
                "Events moved to the dead-letter queue",
            ),
            &["event_type"],
        )?;
        registry.register(Box::new(dead_lettered.clone()))?;

        let worker_restarts = IntCounterVec::new(
            prometheus::Opts::new(
                "switchboard_worker_restarts_total",
                "Worker restarts performed by the supervisor",
            ),
            &["worker_id"],
        )?;
        registry.register(Box::new(worker_restarts.clone()))?;

        let healthy =
            IntGauge::new("switchboard_healthy", "1 if the engine's last health check passed")?;
        registry.register(Box::new(healthy.clone()))?;

        Ok(Self { registry, events, dead_lettered, worker_restarts, healthy })
    }

    /// Expose the registry for HTTP scraping.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl tower_service::Service<EngineEvent> for PrometheusSink {
    type Response = ();
    type Error = Infallible;
    type Future = Ready<Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: EngineEvent) -> Self::Future {
        match &event {
            EngineEvent::Enqueued { .. } => {
                self.events.with_label_values(&["enqueued"]).inc();
            }
            EngineEvent::HandlerSucceeded { .. } => {
                self.events.with_label_values(&["handler_succeeded"]).inc();
            }
            EngineEvent::HandlerRetrying { .. } => {
                self.events.with_label_values(&["handler_retrying"]).inc();
            }
            EngineEvent::DeadLettered { event_type, .. } => {
                self.events.with_label_values(&["dead_lettered"]).inc();
                self.dead_lettered.with_label_values(&[event_type]).inc();
            }
            EngineEvent::FallbackToSync { .. } => {
                self.events.with_label_values(&["fallback_to_sync"]).inc();
            }
            EngineEvent::WorkerRestarted { worker_id, .. } => {
                self.events.with_label_values(&["worker_restarted"]).inc();
                self.worker_restarts.with_label_values(&[&worker_id.to_string()]).inc();
            }
            EngineEvent::HealthChanged { healthy, .. } => {
                self.events.with_label_values(&["health_changed"]).inc();
                self.healthy.set(if *healthy { 1 } else { 0 });
            }
        }
        ready(Ok(()))
    }
}

impl TelemetrySink for PrometheusSink {
    type SinkError = Infallible;
}
