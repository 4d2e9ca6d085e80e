//! Minimal producer/consumer pair: register a handler, emit an event, wait
//! for it to be processed, check the metrics.

use std::sync::Arc;
use std::time::Duration;
use switchboard::{Engine, EngineConfig, Event, FnHandler, HandlerOutcome, Priority};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::builder().worker_count(2).build()?;
    let engine = Engine::start(config).await?;

    engine.register_handler(
        "order.created",
        Arc::new(FnHandler::new(|payload: &[u8]| {
            let len = payload.len();
            async move {
                tracing::info!(bytes = len, "order.created handled");
                Ok::<(), HandlerOutcome>(())
            }
        })),
    );

    engine.emit(Event::new("order.created", b"{\"id\":1}".to_vec(), Priority::Normal)).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = engine.metrics_snapshot();
    println!("processed: {}", snapshot.processed);

    engine.shutdown().await;
    Ok(())
}
