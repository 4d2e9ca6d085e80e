//! Retry engine: wraps a single handler invocation with backoff, jitter,
//! and dead-letter escalation (spec §4.3/§4.4).
//!
//! `run()` makes exactly one handler attempt per call. On a retryable
//! failure it schedules a delayed re-enqueue onto `SharedQueue` rather
//! than looping in place — the event surfaces again at its (incremented)
//! `attempt` the next time any worker dequeues it, which is what keeps a
//! worker blocked on one slow-to-retry event from starving the other
//! priority lanes. If the delayed re-enqueue finds the queue full, it
//! escalates straight to the dead-letter queue instead of retrying the
//! re-enqueue itself.

use crate::config::EngineConfig;
use crate::dlq::{DeadLetterEntry, DeadLetterQueue};
use crate::error::HandlerOutcome;
use crate::event::Event;
use crate::jitter::Jitter;
use crate::metrics::MetricsCollector;
use crate::queue::SharedQueue;
use crate::registry::EventHandler;
use crate::serializer;
use crate::sleeper::Sleeper;
use crate::telemetry::{EngineEvent, TelemetrySink};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Outcome of a single `RetryEngine::run` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// The handler succeeded on this attempt.
    Succeeded,
    /// The handler failed retryably and a delayed re-enqueue was scheduled.
    Retrying,
    /// The handler failed terminally, retries were exhausted, or the
    /// delayed re-enqueue found the queue full.
    DeadLettered,
}

pub struct RetryEngine<S: TelemetrySink> {
    max_retries: u32,
    backoff: crate::backoff::Backoff,
    jitter_enabled: bool,
    sleeper: Arc<dyn Sleeper>,
    dlq: Arc<DeadLetterQueue>,
    queue: Arc<SharedQueue>,
    max_event_size: usize,
    metrics: Arc<MetricsCollector>,
    sink: S,
}

impl<S: TelemetrySink> RetryEngine<S> {
    pub fn new(
        config: &EngineConfig,
        sleeper: Arc<dyn Sleeper>,
        dlq: Arc<DeadLetterQueue>,
        queue: Arc<SharedQueue>,
        metrics: Arc<MetricsCollector>,
        sink: S,
    ) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.backoff(),
            jitter_enabled: config.retry_jitter,
            sleeper,
            dlq,
            queue,
            max_event_size: config.max_event_size,
            metrics,
            sink,
        }
    }

    /// Run `event` against `handler` once. On `HandlerOutcome::Retryable`
    /// with retries remaining, schedules a delayed re-enqueue and returns
    /// immediately; the caller (worker or emitter fallback) is free to move
    /// on to other work without waiting out the backoff.
    pub async fn run(&self, event: Event, handler: Arc<dyn EventHandler>) -> RetryOutcome {
        let started = Instant::now();
        match handler.handle(&event.payload).await {
            Ok(()) => {
                self.metrics.record_processed(started.elapsed());
                crate::telemetry::emit_best_effort(
                    self.sink.clone(),
                    EngineEvent::HandlerSucceeded {
                        event_type: event.event_type.clone(),
                        attempt: event.attempt,
                        duration: started.elapsed(),
                    },
                )
                .await;
                RetryOutcome::Succeeded
            }
            Err(outcome) => {
                if outcome.is_terminal() {
                    self.dead_letter(event, outcome.message().to_string()).await;
                    return RetryOutcome::DeadLettered;
                }
                if event.attempt >= self.max_retries {
                    self.dead_letter(event, outcome.message().to_string()).await;
                    return RetryOutcome::DeadLettered;
                }
                self.schedule_retry(event).await
            }
        }
    }

    /// Compute the backoff delay, emit `HandlerRetrying`, and spawn a task
    /// that sleeps out the delay before re-enqueueing the event at its next
    /// attempt. Escalates to the dead-letter queue immediately if that
    /// re-enqueue finds the queue full (spec §4.3).
    async fn schedule_retry(&self, event: Event) -> RetryOutcome {
        let mut delay = self.backoff.delay(event.attempt as usize + 1);
        if self.jitter_enabled {
            delay = Jitter::event_bus_uniform().apply(delay);
        }

        crate::telemetry::emit_best_effort(
            self.sink.clone(),
            EngineEvent::HandlerRetrying {
                event_type: event.event_type.clone(),
                attempt: event.attempt,
                delay,
            },
        )
        .await;
        self.metrics.record_retried();

        let next = event.next_attempt();
        let queue = self.queue.clone();
        let sleeper = self.sleeper.clone();
        let max_event_size = self.max_event_size;
        let dlq = self.dlq.clone();
        let metrics = self.metrics.clone();
        let sink = self.sink.clone();

        tokio::spawn(async move {
            sleeper.sleep(delay).await;
            re_enqueue_or_dead_letter(next, &queue, max_event_size, &dlq, &metrics, sink).await;
        });

        RetryOutcome::Retrying
    }

    async fn dead_letter(&self, event: Event, reason: String) {
        self.metrics.record_failed();
        self.metrics.record_dead_lettered();
        let attempts = event.attempt;
        let event_type = event.event_type.clone();
        self.dlq.push(DeadLetterEntry {
            event,
            reason: reason.clone(),
            attempts,
            dead_lettered_at: SystemTime::now(),
        });
        crate::telemetry::emit_best_effort(
            self.sink.clone(),
            EngineEvent::DeadLettered { event_type, attempts, reason },
        )
        .await;
    }
}

/// Re-enqueue `event` after its backoff delay has elapsed, or dead-letter
/// it immediately if the queue has no room (spec §4.3's explicit
/// "escalate immediately" clause — the re-enqueue itself is never retried).
async fn re_enqueue_or_dead_letter<S: TelemetrySink>(
    event: Event,
    queue: &Arc<SharedQueue>,
    max_event_size: usize,
    dlq: &Arc<DeadLetterQueue>,
    metrics: &Arc<MetricsCollector>,
    sink: S,
) {
    let priority = event.priority;
    let event_type = event.event_type.clone();
    let attempts = event.attempt;

    let bytes = match serializer::encode(&event, max_event_size) {
        Ok(bytes) => bytes,
        Err(err) => {
            dead_letter_event(event, err.to_string(), dlq, metrics, sink).await;
            return;
        }
    };

    match queue.enqueue(priority, bytes) {
        Ok(()) => {
            metrics.record_enqueued(priority);
            crate::telemetry::emit_best_effort(
                sink,
                EngineEvent::Enqueued { event_type, priority },
            )
            .await;
        }
        Err(_) => {
            dead_letter_event(
                event,
                format!("queue full on retry re-enqueue for '{event_type}' (attempt {attempts})"),
                dlq,
                metrics,
                sink,
            )
            .await;
        }
    }
}

async fn dead_letter_event<S: TelemetrySink>(
    event: Event,
    reason: String,
    dlq: &Arc<DeadLetterQueue>,
    metrics: &Arc<MetricsCollector>,
    sink: S,
) {
    metrics.record_failed();
    metrics.record_dead_lettered();
    let attempts = event.attempt;
    let event_type = event.event_type.clone();
    dlq.push(DeadLetterEntry {
        event,
        reason: reason.clone(),
        attempts,
        dead_lettered_at: SystemTime::now(),
    });
    crate::telemetry::emit_best_effort(sink, EngineEvent::DeadLettered { event_type, attempts, reason })
        .await;
}
