//! Pool supervisor: watches for crashed workers and restarts them under an
//! exponential restart-rate cap, and drives graceful scale/drain (spec
//! §4.6/§4.7).
//!
//! The backoff between restart waves reuses `Backoff::Exponential`
//! (`worker_restart_base_delay` doubling, capped) — the same strategy the
//! retry engine uses for handler retries, applied here to a crashing
//! worker instead of a failing handler.

use crate::backoff::Backoff;
use crate::clock::Clock;
use crate::pool::WorkerPool;
use crate::sleeper::Sleeper;
use crate::telemetry::{EngineEvent, TelemetrySink};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tracks how many times a given worker slot has been restarted, to decide
/// whether the supervisor should keep trying or give up and leave the slot
/// empty (spec §4.6: "a pathologically crashing handler must not be able
/// to restart-storm the process").
struct RestartTracker {
    counts: Mutex<Vec<u32>>,
    threshold: u32,
}

impl RestartTracker {
    fn new(threshold: u32) -> Self {
        Self { counts: Mutex::new(Vec::new()), threshold }
    }

    fn note_restart(&self, index: usize) -> u32 {
        let mut counts = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        if index >= counts.len() {
            counts.resize(index + 1, 0);
        }
        counts[index] += 1;
        counts[index]
    }

    fn exceeded(&self, index: usize) -> bool {
        let counts = self.counts.lock().unwrap_or_else(|p| p.into_inner());
        counts.get(index).copied().unwrap_or(0) > self.threshold
    }
}

pub struct PoolSupervisor<S: TelemetrySink> {
    pool: Mutex<WorkerPool<S>>,
    tracker: RestartTracker,
    restart_backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    sink: S,
    sweep_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl<S: TelemetrySink> PoolSupervisor<S> {
    pub fn new(
        pool: WorkerPool<S>,
        restart_threshold: u32,
        restart_base_delay: Duration,
        sleeper: Arc<dyn Sleeper>,
        sink: S,
        sweep_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool: Mutex::new(pool),
            tracker: RestartTracker::new(restart_threshold),
            restart_backoff: Backoff::exponential(restart_base_delay),
            sleeper,
            sink,
            sweep_interval,
            clock,
        }
    }

    pub fn scale_to(&self, target: usize) {
        self.pool.lock().unwrap_or_else(|p| p.into_inner()).scale_to(target);
    }

    pub fn worker_count(&self) -> usize {
        self.pool.lock().unwrap_or_else(|p| p.into_inner()).worker_count()
    }

    /// `(total, failed)` worker counts for the health evaluator's "worker
    /// health" check (spec §4.9) — `failed` is the same crashed-task signal
    /// `sweep()` restarts from, not per-event handler failure counts.
    pub fn worker_health(&self) -> (usize, usize) {
        let pool = self.pool.lock().unwrap_or_else(|p| p.into_inner());
        (pool.worker_count(), pool.finished_indices().len())
    }

    /// Check for crashed workers and restart any that haven't exceeded the
    /// restart threshold. Returns the number of workers restarted this
    /// sweep. Workers past the threshold are left stopped and reported via
    /// telemetry rather than restarted forever.
    pub async fn sweep(&self) -> usize {
        let finished = {
            let pool = self.pool.lock().unwrap_or_else(|p| p.into_inner());
            pool.finished_indices()
        };

        let mut restarted = 0;
        for index in finished {
            if self.tracker.exceeded(index) {
                continue;
            }

            let count = self.tracker.note_restart(index);
            let delay = self.restart_backoff.delay(count as usize);
            self.sleeper.sleep(delay).await;

            let new_id = {
                let mut pool = self.pool.lock().unwrap_or_else(|p| p.into_inner());
                pool.restart(index)
            };

            if let Some(id) = new_id {
                restarted += 1;
                crate::telemetry::emit_best_effort(
                    self.sink.clone(),
                    EngineEvent::WorkerRestarted { worker_id: id, restart_count: count },
                )
                .await;
            }
        }
        restarted
    }

    /// Run `sweep` on an interval until `iterations` sweeps have executed.
    /// The engine's background supervisor task calls this in an unbounded
    /// loop; tests call it with a fixed budget for determinism.
    pub async fn run_sweeps(&self, iterations: usize) {
        for _ in 0..iterations {
            self.sweep().await;
            self.sleeper.sleep(self.sweep_interval).await;
        }
    }

    pub fn uptime_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Drain the pool gracefully within `timeout`, consuming the supervisor.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        let mut pool = self.pool.into_inner().unwrap_or_else(|p| p.into_inner());
        pool.drain(timeout).await
    }
}
