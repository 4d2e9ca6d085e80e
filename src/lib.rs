#![forbid(unsafe_code)]

//! # Switchboard
//!
//! A buffered, priority-aware, in-process event bus for Rust services:
//! bounded per-priority queues, a worker pool with automatic fault
//! recovery, a retry engine with dead-letter escalation, and the metrics
//! and health reporting a caller needs to run it unattended.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use switchboard::{EngineConfig, Engine, Event, Priority, FnHandler, HandlerOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::builder().worker_count(4).build()?;
//!     let engine = Engine::start(config).await?;
//!
//!     engine.register_handler(
//!         "order.created",
//!         Arc::new(FnHandler::new(|_payload: &[u8]| async {
//!             Ok::<(), HandlerOutcome>(())
//!         })),
//!     );
//!
//!     engine.emit(Event::new("order.created", b"{}".to_vec(), Priority::Normal)).await?;
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```

mod backoff;
mod clock;
mod config;
mod dlq;
mod emitter;
mod engine;
mod error;
mod event;
mod health;
mod jitter;
mod metrics;
mod pool;
mod queue;
mod registry;
mod retry;
mod serializer;
mod sleeper;
mod supervisor;
mod telemetry;
mod worker;

pub use backoff::Backoff;
pub use clock::{Clock, MonotonicClock};
pub use config::{DlqOverflowPolicy, EngineConfig, EngineConfigBuilder};
pub use dlq::{DeadLetterEntry, DeadLetterQueue};
pub use emitter::Emitter;
pub use engine::{DefaultEngine, Engine};
pub use error::{EngineError, HandlerOutcome};
pub use event::{Event, Priority};
pub use health::{CheckStatus, HealthCheck, HealthEvaluator, HealthReport, HealthThresholds};
pub use jitter::Jitter;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use pool::WorkerPool;
pub use queue::SharedQueue;
pub use registry::{EventHandler, FnHandler, HandlerRegistry};
pub use retry::{RetryEngine, RetryOutcome};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use supervisor::PoolSupervisor;
pub use telemetry::{EngineEvent, LogSink, MemorySink, NullSink, TelemetrySink};
pub use worker::{Worker, WorkerStats, WorkerStatus};

pub mod prelude;
