//! A handler that always fails is retried with backoff and eventually
//! dead-lettered once retries are exhausted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use switchboard::{Engine, EngineConfig, Event, FnHandler, HandlerOutcome, Priority};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::builder()
        .worker_count(1)
        .max_retries(2)
        .retry_backoff(Duration::from_millis(100), 2.0)
        .build()?;
    let engine = Engine::start(config).await?;

    let attempts = Arc::new(AtomicUsize::new(0));
    {
        let attempts = attempts.clone();
        engine.register_handler(
            "payment.charge",
            Arc::new(FnHandler::new(move |_payload: &[u8]| {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(HandlerOutcome::Retryable("upstream timeout".into()))
                }
            })),
        );
    }

    engine.emit(Event::new("payment.charge", b"{\"amount\":100}".to_vec(), Priority::Normal)).await?;

    // max_retries(2) means 3 total attempts (initial + 2 retries), with
    // exponential backoff between each; give it room to exhaust them.
    tokio::time::sleep(Duration::from_secs(1)).await;

    println!("handler invocations: {}", attempts.load(Ordering::SeqCst));
    println!("dead-lettered: {}", engine.dlq_len());
    println!("metrics: {:?}", engine.metrics_snapshot());

    engine.shutdown().await;
    Ok(())
}
