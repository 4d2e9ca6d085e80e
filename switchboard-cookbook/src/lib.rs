//! Ready-made configuration recipes for `switchboard`.
//! Each function returns an `EngineConfig` tuned for a specific workload.
//! The goal is pragmatic defaults that are safe for production.
//!
//! **Ladder:**
//! - Simple: [`low_latency`], [`high_durability`]
//! - Intermediate: [`bursty_traffic`]
//! - Advanced: [`strict_no_drop`]
//! - Starter pack: [`sensible_defaults`]

use std::time::Duration;
use switchboard::{DlqOverflowPolicy, EngineConfig, EngineError};

/// Small queue, few workers, short retries: for latency-sensitive, low-volume
/// event types where a slow handler should fail fast rather than queue up.
pub fn low_latency() -> Result<EngineConfig, EngineError> {
    EngineConfig::builder()
        .worker_count(2)
        .max_queue_size(200)
        .max_retries(1)
        .retry_backoff(Duration::from_millis(100), 2.0)
        .graceful_shutdown_timeout(Duration::from_secs(5))
        .build()
}

/// Large dead-letter queue with oldest-eviction, for pipelines where losing
/// the most recent failures to make room for history is worse than losing
/// the oldest ones.
pub fn high_durability() -> Result<EngineConfig, EngineError> {
    EngineConfig::builder()
        .worker_count(4)
        .max_retries(5)
        .retry_backoff(Duration::from_millis(200), 2.0)
        .dlq_max_size(50_000)
        .dlq_overflow_policy(DlqOverflowPolicy::DropOldest)
        .build()
}

/// Large queue and a bigger worker pool, for workloads with spiky admission
/// rates where the bus should absorb bursts rather than fall back to sync.
pub fn bursty_traffic() -> Result<EngineConfig, EngineError> {
    EngineConfig::builder()
        .worker_count(8)
        .max_queue_size(20_000)
        .fallback_to_sync(true)
        .build()
}

/// Disables the synchronous fallback path entirely: `emit()` returns
/// `QueueFull` rather than ever running a handler on the caller's own task.
/// Use when callers must never absorb handler latency.
pub fn strict_no_drop() -> Result<EngineConfig, EngineError> {
    EngineConfig::builder().max_queue_size(5_000).fallback_to_sync(false).build()
}

/// Low-risk default: moderate worker pool, bounded retries, fallback to sync
/// enabled. Good starting point for most event types.
pub fn sensible_defaults() -> Result<EngineConfig, EngineError> {
    EngineConfig::builder()
        .worker_count(4)
        .max_queue_size(1_000)
        .max_retries(3)
        .retry_backoff(Duration::from_millis(100), 2.0)
        .fallback_to_sync(true)
        .build()
}
