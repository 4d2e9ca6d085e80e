//! Telemetry for the event bus: structured events flowing through pluggable sinks.
//!
//! `TelemetrySink` is implemented as a `tower::Service<EngineEvent>`, the
//! donor crate's composability pattern for policy telemetry.

use crate::event::Priority;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::Service;

/// Structured events the engine emits for observability (spec §4.8/ambient logging).
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// An event was admitted to the queue.
    Enqueued { event_type: String, priority: Priority },
    /// A handler ran successfully.
    HandlerSucceeded { event_type: String, attempt: u32, duration: Duration },
    /// A handler failed and will be retried.
    HandlerRetrying { event_type: String, attempt: u32, delay: Duration },
    /// An event was moved to the dead-letter queue.
    DeadLettered { event_type: String, attempts: u32, reason: String },
    /// `emit()` fell back to synchronous dispatch because the queue was full.
    FallbackToSync { event_type: String },
    /// A worker crashed and was restarted by the supervisor.
    WorkerRestarted { worker_id: usize, restart_count: u32 },
    /// The engine's health recommendation changed.
    HealthChanged { healthy: bool, summary: String },
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enqueued { event_type, priority } => {
                write!(f, "enqueued({event_type}, {})", priority.as_str())
            }
            Self::HandlerSucceeded { event_type, attempt, duration } => {
                write!(f, "handler_succeeded({event_type}, attempt={attempt}, {duration:?})")
            }
            Self::HandlerRetrying { event_type, attempt, delay } => {
                write!(f, "handler_retrying({event_type}, attempt={attempt}, delay={delay:?})")
            }
            Self::DeadLettered { event_type, attempts, reason } => {
                write!(f, "dead_lettered({event_type}, attempts={attempts}, reason={reason})")
            }
            Self::FallbackToSync { event_type } => write!(f, "fallback_to_sync({event_type})"),
            Self::WorkerRestarted { worker_id, restart_count } => {
                write!(f, "worker_restarted(id={worker_id}, count={restart_count})")
            }
            Self::HealthChanged { healthy, summary } => {
                write!(f, "health_changed(healthy={healthy}, {summary})")
            }
        }
    }
}

/// A telemetry sink that consumes engine events.
pub trait TelemetrySink:
    tower::Service<EngineEvent, Response = (), Error = Self::SinkError> + Clone + Send + 'static
{
    type SinkError: std::error::Error + Send + 'static;
}

/// Best-effort emit: honors `poll_ready`, swallows errors. Used everywhere
/// the engine fires telemetry from a hot path (admission, retry, dispatch).
pub async fn emit_best_effort<S>(sink: S, event: EngineEvent)
where
    S: tower::Service<EngineEvent, Response = ()> + Send + Clone + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    use tower::ServiceExt;

    if let Ok(mut ready_sink) = sink.ready_oneshot().await {
        let _ = ready_sink.call(event).await;
    }
}

/// Discards all events. The default sink when none is configured.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl Service<EngineEvent> for NullSink {
    type Response = ();
    type Error = std::convert::Infallible;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: EngineEvent) -> Self::Future {
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for NullSink {
    type SinkError = std::convert::Infallible;
}

/// Logs events via `tracing`.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl Service<EngineEvent> for LogSink {
    type Response = ();
    type Error = std::convert::Infallible;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: EngineEvent) -> Self::Future {
        tracing::info!(event = %event, "engine_event");
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for LogSink {
    type SinkError = std::convert::Infallible;
}

/// Stores events in a bounded in-memory ring, oldest-evicted. Intended for
/// tests and the cookbook demos, not production use.
#[derive(Clone, Debug)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<EngineEvent> for MemorySink {
    type Response = ();
    type Error = std::convert::Infallible;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: EngineEvent) -> Self::Future {
        let mut guard = self.events.lock().unwrap_or_else(|p| p.into_inner());
        if guard.len() >= self.capacity {
            guard.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        guard.push(event);
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for MemorySink {
    type SinkError = std::convert::Infallible;
}
