//! Emits a burst of low, normal, and critical events from a single-worker
//! engine and prints the order a handler sees them in, showing that
//! critical events drain ahead of normal ones, which drain ahead of low.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchboard::{Engine, EngineConfig, Event, FnHandler, HandlerOutcome, Priority};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A single worker makes drain order from the three lanes observable.
    let config = EngineConfig::builder().worker_count(1).max_queue_size(100).build()?;
    let engine = Engine::start(config).await?;

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let gate = Arc::new(AtomicUsize::new(0));

    {
        let seen = seen.clone();
        let gate = gate.clone();
        engine.register_handler(
            "task.run",
            Arc::new(FnHandler::new(move |payload: &[u8]| {
                let seen = seen.clone();
                let gate = gate.clone();
                let label = String::from_utf8_lossy(payload).to_string();
                async move {
                    // Hold the first event until the rest have been enqueued,
                    // so the burst below actually queues up before draining.
                    while gate.load(Ordering::SeqCst) < 6 {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                    seen.lock().unwrap().push(label);
                    Ok::<(), HandlerOutcome>(())
                }
            })),
        );
    }

    for (label, priority) in [
        ("low-1", Priority::Low),
        ("normal-1", Priority::Normal),
        ("critical-1", Priority::Critical),
        ("low-2", Priority::Low),
        ("normal-2", Priority::Normal),
        ("critical-2", Priority::Critical),
    ] {
        engine.emit(Event::new("task.run", label.as_bytes().to_vec(), priority)).await?;
        gate.fetch_add(1, Ordering::SeqCst);
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("drain order: {:?}", seen.lock().unwrap());

    engine.shutdown().await;
    Ok(())
}
