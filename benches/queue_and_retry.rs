use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;
use switchboard::{
    DeadLetterQueue, DlqOverflowPolicy, EngineConfig, Event, EventHandler, FnHandler,
    HandlerOutcome, InstantSleeper, MetricsCollector, NullSink, Priority, RetryEngine, SharedQueue,
};

fn queue_enqueue_dequeue_single_lane(c: &mut Criterion) {
    let queue = SharedQueue::new(4096, 65_536);

    c.bench_function("queue_enqueue_dequeue_normal_lane", |b| {
        b.iter(|| {
            queue.enqueue(Priority::Normal, black_box(vec![1, 2, 3, 4])).unwrap();
            black_box(queue.dequeue());
        });
    });
}

fn queue_mixed_priority_drain(c: &mut Criterion) {
    let queue = SharedQueue::new(4096, 65_536);

    c.bench_function("queue_mixed_priority_drain", |b| {
        b.iter(|| {
            queue.enqueue(Priority::Low, vec![0]).unwrap();
            queue.enqueue(Priority::Normal, vec![1]).unwrap();
            queue.enqueue(Priority::Critical, vec![2]).unwrap();
            black_box(queue.dequeue());
            black_box(queue.dequeue());
            black_box(queue.dequeue());
        });
    });
}

fn retry_engine_immediate_success(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = EngineConfig::builder().max_retries(3).build().unwrap();
    let dlq = Arc::new(DeadLetterQueue::new(100, DlqOverflowPolicy::DropNewest));
    let queue = Arc::new(SharedQueue::new(4096, config.max_event_size));
    let metrics = Arc::new(MetricsCollector::new());
    let engine = RetryEngine::new(&config, Arc::new(InstantSleeper), dlq, queue, metrics, NullSink);
    let handler: Arc<dyn EventHandler> =
        Arc::new(FnHandler::new(|_payload: &[u8]| async { Ok::<(), HandlerOutcome>(()) }));

    c.bench_function("retry_engine_first_attempt_success", |b| {
        b.to_async(&rt).iter(|| async {
            let event = Event::new("bench.event", black_box(vec![1, 2, 3]), Priority::Normal);
            black_box(engine.run(event, handler.clone()).await);
        });
    });
}

fn retry_engine_exhausts_to_dlq(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    // max_retries(0): the first retryable failure is already past the
    // retry budget, so `run()` dead-letters within this one call instead
    // of scheduling a re-enqueue the bench would need to wait out.
    let config = EngineConfig::builder()
        .max_retries(0)
        .retry_backoff(Duration::from_millis(100), 2.0)
        .build()
        .unwrap();
    let dlq = Arc::new(DeadLetterQueue::new(10_000, DlqOverflowPolicy::DropOldest));
    let queue = Arc::new(SharedQueue::new(4096, config.max_event_size));
    let metrics = Arc::new(MetricsCollector::new());
    let engine = RetryEngine::new(&config, Arc::new(InstantSleeper), dlq, queue, metrics, NullSink);
    let handler: Arc<dyn EventHandler> = Arc::new(FnHandler::new(|_payload: &[u8]| async {
        Err::<(), HandlerOutcome>(HandlerOutcome::Retryable("always fails".into()))
    }));

    c.bench_function("retry_engine_exhausts_to_dlq", |b| {
        b.to_async(&rt).iter(|| async {
            let event = Event::new("bench.event", vec![], Priority::Normal);
            black_box(engine.run(event, handler.clone()).await);
        });
    });
}

criterion_group!(
    benches,
    queue_enqueue_dequeue_single_lane,
    queue_mixed_priority_drain,
    retry_engine_immediate_success,
    retry_engine_exhausts_to_dlq
);
criterion_main!(benches);
