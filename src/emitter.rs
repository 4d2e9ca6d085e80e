//! Emitter front-end: `emit()`'s validate → admit → fallback-to-sync
//! pipeline (spec §4.2/§4.3 admission path).

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::Event;
use crate::metrics::MetricsCollector;
use crate::queue::SharedQueue;
use crate::registry::HandlerRegistry;
use crate::retry::RetryEngine;
use crate::serializer;
use crate::telemetry::{EngineEvent, TelemetrySink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Emitter<S: TelemetrySink> {
    config: EngineConfig,
    queue: Arc<SharedQueue>,
    registry: HandlerRegistry,
    retry_engine: Arc<RetryEngine<S>>,
    metrics: Arc<MetricsCollector>,
    sink: S,
    initialized: AtomicBool,
    draining: AtomicBool,
}

impl<S: TelemetrySink> Emitter<S> {
    pub fn new(
        config: EngineConfig,
        queue: Arc<SharedQueue>,
        registry: HandlerRegistry,
        retry_engine: Arc<RetryEngine<S>>,
        metrics: Arc<MetricsCollector>,
        sink: S,
    ) -> Self {
        Self {
            config,
            queue,
            registry,
            retry_engine,
            metrics,
            sink,
            initialized: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn begin_draining(&self) {
        self.draining.store(true, Ordering::Release);
    }

    /// Validate and admit `event`. Handler registration is checked at
    /// dequeue time, not here — an event for a type with no handler yet
    /// still admits, so a handler registered after `emit()` can still pick
    /// it up (spec §4.5's dequeue-time lookup, §4.7's emit-time checks are
    /// limited to non-empty type and payload size).
    pub async fn emit(&self, event: Event) -> Result<(), EngineError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(EngineError::NotInitialized);
        }
        if !self.config.enabled {
            return Err(EngineError::Disabled);
        }
        if self.draining.load(Ordering::Acquire) {
            return Err(EngineError::Draining);
        }

        let bytes = serializer::encode(&event, self.config.max_event_size)?;
        let priority = event.priority;
        let event_type = event.event_type.clone();

        match self.queue.enqueue(priority, bytes) {
            Ok(()) => {
                self.metrics.record_enqueued(priority);
                crate::telemetry::emit_best_effort(
                    self.sink.clone(),
                    EngineEvent::Enqueued { event_type, priority },
                )
                .await;
                Ok(())
            }
            Err(EngineError::QueueFull { capacity }) => {
                if !self.config.fallback_to_sync {
                    self.metrics.record_dropped();
                    return Err(EngineError::QueueFull { capacity });
                }
                self.dispatch_sync(event).await
            }
            Err(other) => Err(other),
        }
    }

    /// Run the event to completion on the calling task instead of enqueueing
    /// it, because the queue was full and `fallbackToSync` is enabled (spec
    /// §4.2's explicit "never silently drop" guarantee).
    async fn dispatch_sync(&self, event: Event) -> Result<(), EngineError> {
        self.metrics.record_fallback_to_sync();
        let event_type = event.event_type.clone();
        crate::telemetry::emit_best_effort(
            self.sink.clone(),
            EngineEvent::FallbackToSync { event_type: event_type.clone() },
        )
        .await;

        let Some(handler) = self.registry.get(&event.event_type) else {
            self.metrics.record_dropped();
            return Err(EngineError::NoHandler { event_type });
        };

        self.retry_engine.run(event, handler).await;
        Ok(())
    }
}
