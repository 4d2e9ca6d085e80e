//! Polls `Engine::health()` and `Engine::metrics_snapshot()` on a timer
//! while a mixed stream of events flows through, the way an operator's
//! sidecar or admin endpoint would.

use std::sync::Arc;
use std::time::Duration;
use switchboard::{Engine, EngineConfig, Event, FnHandler, HandlerOutcome, Priority};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::builder().worker_count(3).build()?;
    let engine = Engine::start(config).await?;

    engine.register_handler(
        "metric.tick",
        Arc::new(FnHandler::new(|_payload: &[u8]| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<(), HandlerOutcome>(())
        })),
    );

    for i in 0..50 {
        let priority = if i % 10 == 0 { Priority::Critical } else { Priority::Normal };
        engine.emit(Event::new("metric.tick", vec![i as u8], priority)).await?;
    }

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let report = engine.health();
        let snap = engine.metrics_snapshot();
        println!(
            "healthy={} score={:.2} recommendation={:?} queue_depth={} processed={} p99_us={}",
            report.healthy,
            report.score,
            report.recommendation,
            snap.queue_depth,
            snap.processed,
            snap.latency_p99_micros,
        );
    }

    engine.shutdown().await;
    Ok(())
}
