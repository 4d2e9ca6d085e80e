//! Worker pool: owns the set of `Worker`s and their tokio task handles
//! (spec §4.5/§4.6). Scaling and fault recovery live in `supervisor`; this
//! module is just the spawn/join bookkeeping the supervisor drives.

use crate::metrics::MetricsCollector;
use crate::queue::SharedQueue;
use crate::registry::HandlerRegistry;
use crate::retry::RetryEngine;
use crate::sleeper::Sleeper;
use crate::telemetry::TelemetrySink;
use crate::worker::{Worker, WorkerStats};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct PoolMember {
    worker: Arc<Worker>,
    handle: JoinHandle<()>,
    /// Set by `scale_to`'s down-path to signal just this worker to finish
    /// its in-flight dispatch and stop, without touching the others.
    drain: Arc<AtomicBool>,
}

/// A running set of workers sharing one queue and handler registry.
pub struct WorkerPool<S: TelemetrySink> {
    members: Vec<PoolMember>,
    queue: Arc<SharedQueue>,
    registry: HandlerRegistry,
    sleeper: Arc<dyn Sleeper>,
    retry_engine: Arc<RetryEngine<S>>,
    metrics: Arc<MetricsCollector>,
    max_event_size: usize,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
    next_id: usize,
}

impl<S: TelemetrySink> WorkerPool<S> {
    pub fn new(
        queue: Arc<SharedQueue>,
        registry: HandlerRegistry,
        sleeper: Arc<dyn Sleeper>,
        retry_engine: Arc<RetryEngine<S>>,
        metrics: Arc<MetricsCollector>,
        max_event_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            members: Vec::new(),
            queue,
            registry,
            sleeper,
            retry_engine,
            metrics,
            max_event_size,
            poll_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            next_id: 0,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.members.len()
    }

    /// Spawn one additional worker and start its run loop.
    pub fn spawn_one(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;

        let worker = Arc::new(Worker::new(
            id,
            self.queue.clone(),
            self.registry.clone(),
            self.metrics.clone(),
            self.max_event_size,
            self.poll_interval,
        ));

        let drain = Arc::new(AtomicBool::new(false));
        let handle = self.spawn_task(worker.clone(), drain.clone());
        self.members.push(PoolMember { worker, handle, drain });
        id
    }

    fn spawn_task(&self, worker: Arc<Worker>, drain: Arc<AtomicBool>) -> JoinHandle<()> {
        let sleeper = self.sleeper.clone();
        let retry_engine = self.retry_engine.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            worker.run(sleeper, retry_engine, shutdown, drain).await;
        })
    }

    /// Scale the pool up or down to `target` workers (spec §4.6 `scaleTo`).
    /// Scaling down signals the excess workers to drain — finish any
    /// in-flight dispatch, then stop on their own — rather than aborting
    /// their tasks mid-invocation.
    pub fn scale_to(&mut self, target: usize) {
        while self.members.len() < target {
            self.spawn_one();
        }
        while self.members.len() > target {
            if let Some(member) = self.members.pop() {
                member.drain.store(true, std::sync::atomic::Ordering::Release);
            }
        }
    }

    /// Replace a dead worker's slot with a freshly spawned one, returning
    /// the new worker's id. Used by the supervisor's restart policy; the
    /// old task is already finished (crashed) here, so aborting it is a
    /// no-op rather than a destructive cutoff.
    pub fn restart(&mut self, index: usize) -> Option<usize> {
        if index >= self.members.len() {
            return None;
        }
        self.members[index].handle.abort();
        let worker = Arc::new(Worker::new(
            self.members[index].worker.id,
            self.queue.clone(),
            self.registry.clone(),
            self.metrics.clone(),
            self.max_event_size,
            self.poll_interval,
        ));
        let drain = Arc::new(AtomicBool::new(false));
        let handle = self.spawn_task(worker.clone(), drain.clone());
        let id = worker.id;
        self.members[index] = PoolMember { worker, handle, drain };
        Some(id)
    }

    /// Returns the indices of workers whose task has finished (crashed or
    /// completed) while the pool is not draining.
    pub fn finished_indices(&self) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.handle.is_finished())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn worker_stats(&self) -> Vec<Arc<WorkerStats>> {
        self.members.iter().map(|m| m.worker.stats()).collect()
    }

    /// Signal all workers to stop accepting new work and drain what's left
    /// in the queue, then await their completion within `timeout`. Any
    /// worker still running when `timeout` elapses is force-stopped (spec
    /// §5: shutdown must force-stop remaining workers at the deadline).
    pub async fn drain(&mut self, timeout: Duration) -> bool {
        self.shutdown.store(true, std::sync::atomic::Ordering::Release);
        let members: Vec<_> = self.members.drain(..).collect();
        let abort_handles: Vec<_> = members.iter().map(|m| m.handle.abort_handle()).collect();
        let handles: Vec<_> = members.into_iter().map(|m| m.handle).collect();

        let joined = tokio::time::timeout(timeout, futures::future::join_all(handles)).await;
        if joined.is_err() {
            for handle in &abort_handles {
                handle.abort();
            }
        }
        joined.is_ok()
    }
}
