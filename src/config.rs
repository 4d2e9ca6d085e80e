//! Engine configuration: validated construction plus environment overrides (spec §6).

use crate::backoff::Backoff;
use crate::error::EngineError;
use std::time::Duration;

/// Dead-letter-queue overflow policy (spec §3/§9 Open Question 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlqOverflowPolicy {
    /// Default: preserve history, refuse the newest entry when full.
    DropNewest,
    /// Alternative: evict the oldest entry to make room for the newest.
    DropOldest,
}

impl Default for DlqOverflowPolicy {
    fn default() -> Self {
        DlqOverflowPolicy::DropNewest
    }
}

/// Validated engine configuration (spec §6).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub enabled: bool,
    pub worker_count: usize,
    pub max_queue_size: usize,
    pub max_event_size: usize,
    pub max_memory_bytes: u64,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_multiplier: f64,
    pub retry_jitter: bool,
    pub dlq_max_size: usize,
    pub dlq_overflow_policy: DlqOverflowPolicy,
    pub metrics_interval: Duration,
    pub health_check_interval: Duration,
    pub fallback_to_sync: bool,
    pub graceful_shutdown_timeout: Duration,
    pub worker_restart_threshold: u32,
    pub worker_idle_timeout: Duration,
    pub worker_restart_base_delay: Duration,
    pub worker_poll_interval: Duration,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Retry backoff derived from `retry_base_delay`/`retry_multiplier`.
    pub fn backoff(&self) -> Backoff {
        Backoff::exponential_with_multiplier(self.retry_base_delay, self.retry_multiplier)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigBuilder::new().build().expect("default config is valid")
    }
}

/// Builder that validates on `build()`, in the donor's
/// `RetryPolicyBuilder`/`CircuitBreakerConfig` style (constructors return
/// `Result`, never panic on bad input).
pub struct EngineConfigBuilder {
    enabled: bool,
    worker_count: usize,
    max_queue_size: usize,
    max_event_size: usize,
    max_memory_bytes: u64,
    max_retries: u32,
    retry_base_delay: Duration,
    retry_multiplier: f64,
    retry_jitter: bool,
    dlq_max_size: usize,
    dlq_overflow_policy: DlqOverflowPolicy,
    metrics_interval: Duration,
    health_check_interval: Duration,
    fallback_to_sync: bool,
    graceful_shutdown_timeout: Duration,
    worker_restart_threshold: u32,
    worker_idle_timeout: Duration,
    worker_restart_base_delay: Duration,
    worker_poll_interval: Duration,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            enabled: true,
            worker_count: 4,
            max_queue_size: 1_000,
            max_event_size: 65_536,
            max_memory_bytes: 64 * 1024 * 1024,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            retry_multiplier: 2.0,
            retry_jitter: true,
            dlq_max_size: 1_000,
            dlq_overflow_policy: DlqOverflowPolicy::default(),
            metrics_interval: Duration::from_secs(10),
            health_check_interval: Duration::from_secs(30),
            fallback_to_sync: true,
            graceful_shutdown_timeout: Duration::from_secs(30),
            worker_restart_threshold: 5,
            worker_idle_timeout: Duration::from_secs(60),
            worker_restart_base_delay: Duration::from_millis(500),
            worker_poll_interval: Duration::from_millis(10),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn worker_count(mut self, n: usize) -> Self {
        self.worker_count = n;
        self
    }

    pub fn max_queue_size(mut self, n: usize) -> Self {
        self.max_queue_size = n;
        self
    }

    pub fn max_event_size(mut self, n: usize) -> Self {
        self.max_event_size = n;
        self
    }

    pub fn max_memory_bytes(mut self, n: u64) -> Self {
        self.max_memory_bytes = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn retry_backoff(mut self, base_delay: Duration, multiplier: f64) -> Self {
        self.retry_base_delay = base_delay;
        self.retry_multiplier = multiplier;
        self
    }

    pub fn retry_jitter(mut self, enabled: bool) -> Self {
        self.retry_jitter = enabled;
        self
    }

    pub fn dlq_max_size(mut self, n: usize) -> Self {
        self.dlq_max_size = n;
        self
    }

    pub fn dlq_overflow_policy(mut self, policy: DlqOverflowPolicy) -> Self {
        self.dlq_overflow_policy = policy;
        self
    }

    pub fn monitoring_intervals(mut self, metrics: Duration, health_check: Duration) -> Self {
        self.metrics_interval = metrics;
        self.health_check_interval = health_check;
        self
    }

    pub fn fallback_to_sync(mut self, enabled: bool) -> Self {
        self.fallback_to_sync = enabled;
        self
    }

    pub fn graceful_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.graceful_shutdown_timeout = timeout;
        self
    }

    pub fn worker_restart_threshold(mut self, n: u32) -> Self {
        self.worker_restart_threshold = n;
        self
    }

    pub fn worker_idle_timeout(mut self, timeout: Duration) -> Self {
        self.worker_idle_timeout = timeout;
        self
    }

    /// Apply environment overrides (spec §6), where set.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(v) = env_bool("EVENTS_ENABLED") {
            self.enabled = v;
        }
        if let Some(v) = env_usize("EVENTS_WORKER_COUNT") {
            self.worker_count = v;
        }
        if let Some(v) = env_usize("EVENTS_MAX_QUEUE_SIZE") {
            self.max_queue_size = v;
        }
        if let Some(v) = env_u64("EVENTS_MAX_MEMORY_BYTES") {
            self.max_memory_bytes = v;
        }
        if let Some(v) = env_usize("EVENTS_MAX_RETRIES") {
            self.max_retries = v as u32;
        }
        self
    }

    /// Validate and construct the final config (spec §7: `ConfigurationInvalid`).
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        if !(1..=20).contains(&self.worker_count) {
            return Err(invalid(format!(
                "workerCount must be in [1, 20], got {}",
                self.worker_count
            )));
        }
        if self.max_queue_size < 100 {
            return Err(invalid(format!(
                "maxQueueSize must be >= 100, got {}",
                self.max_queue_size
            )));
        }
        if self.max_event_size < 1024 {
            return Err(invalid(format!(
                "maxEventSize must be >= 1024, got {}",
                self.max_event_size
            )));
        }
        if self.max_retries > 10 {
            return Err(invalid(format!("maxRetries must be in [0, 10], got {}", self.max_retries)));
        }
        if self.retry_base_delay < Duration::from_millis(100) {
            return Err(invalid(format!(
                "retryBaseDelayMs must be >= 100, got {:?}",
                self.retry_base_delay
            )));
        }
        if self.retry_multiplier <= 0.0 {
            return Err(invalid(format!(
                "retryMultiplier must be > 0, got {}",
                self.retry_multiplier
            )));
        }

        Ok(EngineConfig {
            enabled: self.enabled,
            worker_count: self.worker_count,
            max_queue_size: self.max_queue_size,
            max_event_size: self.max_event_size,
            max_memory_bytes: self.max_memory_bytes,
            max_retries: self.max_retries,
            retry_base_delay: self.retry_base_delay,
            retry_multiplier: self.retry_multiplier,
            retry_jitter: self.retry_jitter,
            dlq_max_size: self.dlq_max_size,
            dlq_overflow_policy: self.dlq_overflow_policy,
            metrics_interval: self.metrics_interval,
            health_check_interval: self.health_check_interval,
            fallback_to_sync: self.fallback_to_sync,
            graceful_shutdown_timeout: self.graceful_shutdown_timeout,
            worker_restart_threshold: self.worker_restart_threshold,
            worker_idle_timeout: self.worker_idle_timeout,
            worker_restart_base_delay: self.worker_restart_base_delay,
            worker_poll_interval: self.worker_poll_interval,
        })
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(reason: String) -> EngineError {
    EngineError::ConfigurationInvalid { reason }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|v| match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
