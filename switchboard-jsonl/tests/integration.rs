use switchboard::EngineEvent;
use switchboard_jsonl::JsonlSink;
use tower_service::Service;

#[tokio::test]
async fn writes_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut sink = JsonlSink::new(path.to_string_lossy().to_string());

    let event = EngineEvent::FallbackToSync { event_type: "order.created".into() };
    sink.call(event).await.unwrap();

    let contents = std::fs::read_to_string(&path).expect("file");
    assert!(contents.contains("fallback_to_sync"));
    assert!(contents.contains("order.created"));
}

#[tokio::test]
async fn appends_multiple_events_as_separate_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut sink = JsonlSink::new(path.to_string_lossy().to_string());

    sink.call(EngineEvent::WorkerRestarted { worker_id: 0, restart_count: 1 }).await.unwrap();
    sink.call(EngineEvent::WorkerRestarted { worker_id: 1, restart_count: 1 }).await.unwrap();

    let contents = std::fs::read_to_string(&path).expect("file");
    assert_eq!(contents.lines().count(), 2);
}
