//! End-to-end scenarios exercising `Engine` through its public API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchboard::{Engine, EngineConfig, Event, FnHandler, HandlerOutcome, Priority};

#[tokio::test]
async fn happy_path_processes_every_event_exactly_once() {
    let config =
        EngineConfig::builder().worker_count(2).max_queue_size(100).max_retries(0).build().unwrap();
    let engine = Engine::start(config).await.unwrap();

    let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        engine.register_handler(
            "t.ok",
            Arc::new(FnHandler::new(move |payload: &[u8]| {
                let seen = seen.clone();
                let byte = payload[0];
                async move {
                    seen.lock().unwrap().push(byte);
                    Ok::<(), HandlerOutcome>(())
                }
            })),
        );
    }

    for i in 0..10u8 {
        engine.emit(Event::new("t.ok", vec![i], Priority::Normal)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snap = engine.metrics_snapshot();
    assert_eq!(snap.enqueued, 10);
    assert_eq!(snap.processed, 10);
    assert_eq!(snap.failed, 0);
    assert_eq!(engine.dlq_len(), 0);
    let mut got = seen.lock().unwrap().clone();
    got.sort_unstable();
    assert_eq!(got, (0..10u8).collect::<Vec<_>>());

    engine.shutdown().await;
}

#[tokio::test]
async fn priority_ordering_drains_critical_before_normal() {
    let config = EngineConfig::builder().worker_count(1).max_queue_size(100).build().unwrap();
    let engine = Engine::start(config).await.unwrap();

    let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let gate_open = Arc::new(AtomicBool::new(false));
    {
        let order = order.clone();
        let gate_open = gate_open.clone();
        engine.register_handler(
            "t.order",
            Arc::new(FnHandler::new(move |payload: &[u8]| {
                let order = order.clone();
                let gate_open = gate_open.clone();
                let label = String::from_utf8_lossy(payload).to_string();
                async move {
                    while !gate_open.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(2)).await;
                    }
                    order.lock().unwrap().push(label);
                    Ok::<(), HandlerOutcome>(())
                }
            })),
        );
    }

    // Queue E1, E2, E3 (normal) then C1 (critical) before letting the worker proceed.
    engine.emit(Event::new("t.order", b"E1".to_vec(), Priority::Normal)).await.unwrap();
    engine.emit(Event::new("t.order", b"E2".to_vec(), Priority::Normal)).await.unwrap();
    engine.emit(Event::new("t.order", b"E3".to_vec(), Priority::Normal)).await.unwrap();
    engine.emit(Event::new("t.order", b"C1".to_vec(), Priority::Critical)).await.unwrap();
    gate_open.store(true, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let final_order = order.lock().unwrap().clone();
    assert_eq!(final_order, vec!["C1", "E1", "E2", "E3"]);

    engine.shutdown().await;
}

#[tokio::test]
async fn retries_then_succeeds_on_third_attempt() {
    let config = EngineConfig::builder()
        .worker_count(1)
        .max_retries(2)
        .retry_backoff(Duration::from_millis(100), 2.0)
        .retry_jitter(false)
        .build()
        .unwrap();
    let engine = Engine::start(config).await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = calls.clone();
        engine.register_handler(
            "t.flaky",
            Arc::new(FnHandler::new(move |_payload: &[u8]| {
                let calls = calls.clone();
                async move {
                    let attempt = calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(HandlerOutcome::Retryable("transient".into()))
                    } else {
                        Ok(())
                    }
                }
            })),
        );
    }

    engine.emit(Event::new("t.flaky", vec![], Priority::Normal)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let snap = engine.metrics_snapshot();
    assert_eq!(snap.processed, 1);
    assert_eq!(snap.retried, 2);
    assert_eq!(engine.dlq_len(), 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn retries_exhausted_dead_letters_with_last_error() {
    let config = EngineConfig::builder()
        .worker_count(1)
        .max_retries(2)
        .retry_backoff(Duration::from_millis(100), 2.0)
        .retry_jitter(false)
        .build()
        .unwrap();
    let engine = Engine::start(config).await.unwrap();

    engine.register_handler(
        "t.always_fails",
        Arc::new(FnHandler::new(|_payload: &[u8]| async {
            Err::<(), HandlerOutcome>(HandlerOutcome::Retryable("upstream down".into()))
        })),
    );

    engine.emit(Event::new("t.always_fails", vec![], Priority::Normal)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;

    let snap = engine.metrics_snapshot();
    assert_eq!(snap.failed, 1);
    assert_eq!(engine.dlq_len(), 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn queue_full_falls_back_to_sync_without_dropping() {
    let config = EngineConfig::builder()
        .worker_count(1)
        .max_queue_size(100)
        .fallback_to_sync(true)
        .build()
        .unwrap();
    let engine = Engine::start(config).await.unwrap();

    engine.register_handler(
        "t.slow",
        Arc::new(FnHandler::new(|_payload: &[u8]| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<(), HandlerOutcome>(())
        })),
    );

    // Far more than the queue's 100-slot capacity, so admission overflow into
    // synchronous fallback is guaranteed regardless of how the scheduler
    // interleaves the single worker with this burst.
    const TOTAL: usize = 300;
    for _ in 0..TOTAL {
        engine.emit(Event::new("t.slow", vec![], Priority::Normal)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    let snap = engine.metrics_snapshot();
    assert_eq!(snap.processed as usize, TOTAL);
    assert_eq!(snap.failed, 0);
    assert!(snap.fallback_to_sync >= 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn worker_fault_recovers_and_resumes_processing() {
    let config = EngineConfig::builder()
        .worker_count(2)
        .monitoring_intervals(Duration::from_secs(10), Duration::from_millis(20))
        .build()
        .unwrap();
    let sink = switchboard::MemorySink::new();
    let engine = Engine::start_with_sink(config, sink.clone()).await.unwrap();

    let crashed_once = Arc::new(AtomicBool::new(false));
    let processed = Arc::new(AtomicUsize::new(0));
    {
        let crashed_once = crashed_once.clone();
        let processed = processed.clone();
        engine.register_handler(
            "t.panicky",
            Arc::new(FnHandler::new(move |_payload: &[u8]| {
                let crashed_once = crashed_once.clone();
                let processed = processed.clone();
                async move {
                    if !crashed_once.swap(true, Ordering::SeqCst) {
                        panic!("injected worker-loop fault");
                    }
                    processed.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), HandlerOutcome>(())
                }
            })),
        );
    }

    engine.emit(Event::new("t.panicky", vec![], Priority::Normal)).await.unwrap();
    // Give the supervisor a few sweeps to notice and restart the crashed worker.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(engine.worker_count(), 2);
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, switchboard::EngineEvent::WorkerRestarted { .. })));

    engine.emit(Event::new("t.panicky", vec![], Priority::Normal)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(processed.load(Ordering::SeqCst), 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn shutdown_drain_accounts_for_every_enqueued_event() {
    let config = EngineConfig::builder()
        .worker_count(4)
        .max_queue_size(100)
        .graceful_shutdown_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let engine = Engine::start(config).await.unwrap();

    engine.register_handler(
        "t.batch",
        Arc::new(FnHandler::new(|_payload: &[u8]| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<(), HandlerOutcome>(())
        })),
    );

    const TOTAL: u64 = 50;
    for _ in 0..TOTAL {
        engine.emit(Event::new("t.batch", vec![], Priority::Normal)).await.unwrap();
    }

    let snap_before = engine.metrics_snapshot();
    let drained_cleanly = engine.shutdown().await;
    assert!(drained_cleanly);

    let accounted = snap_before.enqueued;
    assert_eq!(accounted, TOTAL);
}

