//! JSONL sink for `switchboard`. Writes one event per line.
//! Always writes; bring your own path.

use serde_json::json;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use switchboard::{EngineEvent, TelemetrySink};

#[derive(Clone, Debug)]
pub struct JsonlSink {
    path: String,
}

impl JsonlSink {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self { path: path.into() }
    }
}

impl tower_service::Service<EngineEvent> for JsonlSink {
    type Response = ();
    type Error = io::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: EngineEvent) -> Self::Future {
        let path = self.path.clone();
        let line = event_to_json(&event).to_string() + "\n";
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;
            let mut file =
                tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            Ok(())
        })
    }
}

impl TelemetrySink for JsonlSink {
    type SinkError = io::Error;
}

fn event_to_json(event: &EngineEvent) -> serde_json::Value {
    match event {
        EngineEvent::Enqueued { event_type, priority } => {
            json!({ "kind": "enqueued", "event_type": event_type, "priority": priority.as_str() })
        }
        EngineEvent::HandlerSucceeded { event_type, attempt, duration } => json!({
            "kind": "handler_succeeded",
            "event_type": event_type,
            "attempt": attempt,
            "duration_ms": duration.as_millis(),
        }),
        EngineEvent::HandlerRetrying { event_type, attempt, delay } => json!({
            "kind": "handler_retrying",
            "event_type": event_type,
            "attempt": attempt,
            "delay_ms": delay.as_millis(),
        }),
        EngineEvent::DeadLettered { event_type, attempts, reason } => json!({
            "kind": "dead_lettered",
            "event_type": event_type,
            "attempts": attempts,
            "reason": reason,
        }),
        EngineEvent::FallbackToSync { event_type } => {
            json!({ "kind": "fallback_to_sync", "event_type": event_type })
        }
        EngineEvent::WorkerRestarted { worker_id, restart_count } => json!({
            "kind": "worker_restarted",
            "worker_id": worker_id,
            "restart_count": restart_count,
        }),
        EngineEvent::HealthChanged { healthy, summary } => {
            json!({ "kind": "health_changed", "healthy": healthy, "summary": summary })
        }
    }
}
