//! Convenient re-exports for common Switchboard types.
pub use crate::{
    config::{DlqOverflowPolicy, EngineConfig, EngineConfigBuilder},
    dlq::{DeadLetterEntry, DeadLetterQueue},
    emitter::Emitter,
    engine::{DefaultEngine, Engine},
    error::{EngineError, HandlerOutcome},
    event::{Event, Priority},
    health::{HealthEvaluator, HealthReport, HealthThresholds},
    metrics::{MetricsCollector, MetricsSnapshot},
    pool::WorkerPool,
    queue::SharedQueue,
    registry::{EventHandler, FnHandler, HandlerRegistry},
    retry::{RetryEngine, RetryOutcome},
    supervisor::PoolSupervisor,
    telemetry::{EngineEvent, LogSink, MemorySink, NullSink, TelemetrySink},
    Backoff, Jitter,
};
