//! Health evaluator: turns a metrics snapshot into a weighted set of checks
//! and an overall recommendation (spec §4.9).
//!
//! Six checks, each independently weighted: queue depth, processing rate,
//! worker health, memory utilization, error rate, and emitter impact.
//! "Emitter impact" is approximated rather than measured directly — the
//! evaluator treats fallback-to-sync rate as the proxy signal, since that's
//! the one place queue pressure spills onto the caller's own thread (see
//! the resolution recorded in the grounding ledger). "Memory utilization"
//! is likewise approximate: queue occupancy × slot size over the
//! configured memory ceiling, not a real allocator reading.

use crate::metrics::MetricsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub weight: f64,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub healthy: bool,
    pub score: f64,
    pub checks: Vec<HealthCheck>,
    pub recommendation: &'static str,
}

/// Thresholds the evaluator checks against. Exposed so callers can tune
/// sensitivity without forking the evaluator.
#[derive(Debug, Clone)]
pub struct HealthThresholds {
    pub queue_depth_warn_ratio: f64,
    pub queue_depth_fail_ratio: f64,
    /// Configured processing-rate floor, events/sec. `0.0` disables the
    /// check (always `Pass`) since no floor has been configured.
    pub min_processing_rate_per_sec: f64,
    pub memory_warn_ratio: f64,
    pub memory_fail_ratio: f64,
    pub error_rate_warn: f64,
    pub error_rate_fail: f64,
    pub emitter_impact_warn: f64,
    pub emitter_impact_fail: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            queue_depth_warn_ratio: 0.7,
            queue_depth_fail_ratio: 0.90,
            min_processing_rate_per_sec: 0.0,
            memory_warn_ratio: 0.75,
            memory_fail_ratio: 0.90,
            error_rate_warn: 0.05,
            error_rate_fail: 0.10,
            emitter_impact_warn: 0.01,
            emitter_impact_fail: 0.1,
        }
    }
}

#[derive(Clone)]
pub struct HealthEvaluator {
    thresholds: HealthThresholds,
    queue_capacity: usize,
    max_event_size: usize,
    max_memory_bytes: u64,
}

impl HealthEvaluator {
    pub fn new(queue_capacity: usize, max_event_size: usize, max_memory_bytes: u64) -> Self {
        Self {
            thresholds: HealthThresholds::default(),
            queue_capacity,
            max_event_size,
            max_memory_bytes,
        }
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Evaluate a snapshot into weighted checks and an overall score in
    /// `[0.0, 1.0]`. `worker_total`/`worker_failed` come from the
    /// supervisor's crashed-task count, not per-event handler failures.
    /// `healthy` is true when the score clears 0.5 and no check is `Fail`;
    /// `recommendation` additionally distinguishes a score below 0.8 (or
    /// any `Warn`) as `"monitor"` from a fully nominal run.
    pub fn evaluate(
        &self,
        snapshot: &MetricsSnapshot,
        worker_total: usize,
        worker_failed: usize,
    ) -> HealthReport {
        let mut checks = Vec::new();

        let queue_ratio = if self.queue_capacity == 0 {
            0.0
        } else {
            snapshot.queue_depth as f64 / self.queue_capacity as f64
        };
        checks.push(self.ratio_check(
            "queue_depth",
            queue_ratio,
            self.thresholds.queue_depth_warn_ratio,
            self.thresholds.queue_depth_fail_ratio,
            0.20,
            format!("{:.0}% of capacity", queue_ratio * 100.0),
        ));

        checks.push(self.processing_rate_check(snapshot.throughput_per_sec));

        checks.push(self.worker_health_check(worker_total, worker_failed));

        let memory_ratio = if self.max_memory_bytes == 0 {
            0.0
        } else {
            (snapshot.queue_depth as f64 * self.max_event_size as f64) / self.max_memory_bytes as f64
        };
        checks.push(self.ratio_check(
            "memory_utilization",
            memory_ratio,
            self.thresholds.memory_warn_ratio,
            self.thresholds.memory_fail_ratio,
            0.15,
            format!("{:.0}% of configured memory ceiling (approximate)", memory_ratio * 100.0),
        ));

        checks.push(self.ratio_check(
            "error_rate",
            snapshot.error_rate,
            self.thresholds.error_rate_warn,
            self.thresholds.error_rate_fail,
            0.20,
            format!("{:.1}% of completed events failed", snapshot.error_rate * 100.0),
        ));

        let emitter_impact = if snapshot.enqueued == 0 {
            0.0
        } else {
            snapshot.fallback_to_sync as f64 / snapshot.enqueued as f64
        };
        checks.push(self.ratio_check(
            "emitter_impact",
            emitter_impact,
            self.thresholds.emitter_impact_warn,
            self.thresholds.emitter_impact_fail,
            0.10,
            format!("{:.2}% of emits fell back to synchronous dispatch", emitter_impact * 100.0),
        ));

        let total_weight: f64 = checks.iter().map(|c| c.weight).sum();
        let score = checks
            .iter()
            .map(|c| {
                let value = match c.status {
                    CheckStatus::Pass => 1.0,
                    CheckStatus::Warn => 0.5,
                    CheckStatus::Fail => 0.0,
                };
                value * c.weight
            })
            .sum::<f64>()
            / total_weight.max(f64::EPSILON);

        let any_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
        let any_warn = checks.iter().any(|c| c.status == CheckStatus::Warn);
        let healthy = score >= 0.5 && !any_fail;

        let recommendation = if any_fail || score < 0.5 {
            "scale_up_or_drain_dlq"
        } else if any_warn || score < 0.8 {
            "monitor"
        } else {
            "nominal"
        };

        HealthReport { healthy, score, checks, recommendation }
    }

    fn processing_rate_check(&self, throughput_per_sec: f64) -> HealthCheck {
        let floor = self.thresholds.min_processing_rate_per_sec;
        if floor <= 0.0 {
            return HealthCheck {
                name: "processing_rate",
                status: CheckStatus::Pass,
                weight: 0.15,
                detail: "no processing-rate floor configured".to_string(),
            };
        }
        let status = if throughput_per_sec < floor / 2.0 {
            CheckStatus::Fail
        } else if throughput_per_sec < floor {
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        HealthCheck {
            name: "processing_rate",
            status,
            weight: 0.15,
            detail: format!("{throughput_per_sec:.2} events/sec (floor {floor:.2})"),
        }
    }

    fn worker_health_check(&self, total: usize, failed: usize) -> HealthCheck {
        if total == 0 {
            return HealthCheck {
                name: "worker_health",
                status: CheckStatus::Pass,
                weight: 0.20,
                detail: "no workers configured".to_string(),
            };
        }
        let ratio = failed as f64 / total as f64;
        let status = if ratio > 0.5 {
            CheckStatus::Fail
        } else if failed > 0 {
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        HealthCheck {
            name: "worker_health",
            status,
            weight: 0.20,
            detail: format!("{failed}/{total} workers failed"),
        }
    }

    fn ratio_check(
        &self,
        name: &'static str,
        value: f64,
        warn: f64,
        fail: f64,
        weight: f64,
        detail: String,
    ) -> HealthCheck {
        let status = if value >= fail {
            CheckStatus::Fail
        } else if value >= warn {
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        HealthCheck { name, status, weight, detail }
    }
}
