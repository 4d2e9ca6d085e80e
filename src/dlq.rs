//! Dead-letter queue: terminal home for events that exhaust retries or
//! return a terminal handler outcome (spec §4.4).
//!
//! Bounded by `dlq_max_size`. Entry shape follows the donor pack's
//! dead-letter-queue example (event id, original payload, error, attempt
//! count, timestamps) with the persistence layer stripped since this bus is
//! in-process only.

use crate::config::DlqOverflowPolicy;
use crate::event::Event;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

/// A dead-lettered event.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub event: Event,
    pub reason: String,
    pub attempts: u32,
    pub dead_lettered_at: SystemTime,
}

/// Bounded, in-memory dead-letter store.
pub struct DeadLetterQueue {
    entries: Mutex<VecDeque<DeadLetterEntry>>,
    max_size: usize,
    overflow_policy: DlqOverflowPolicy,
    dropped: AtomicU64,
}

impl DeadLetterQueue {
    pub fn new(max_size: usize, overflow_policy: DlqOverflowPolicy) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max_size.min(1024))),
            max_size: max_size.max(1),
            overflow_policy,
            dropped: AtomicU64::new(0),
        }
    }

    /// Push a terminally-failed event. Applies the configured overflow
    /// policy when the queue is already at `max_size`:
    /// `DropNewest` (default) refuses the incoming entry and keeps history;
    /// `DropOldest` evicts entry 0 to make room.
    pub fn push(&self, entry: DeadLetterEntry) {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if guard.len() >= self.max_size {
            match self.overflow_policy {
                DlqOverflowPolicy::DropNewest => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                DlqOverflowPolicy::DropOldest => {
                    guard.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        guard.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Snapshot of current entries, oldest first.
    pub fn entries(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).iter().cloned().collect()
    }

    /// Remove and return the oldest entry, for manual replay tooling.
    pub fn pop_oldest(&self) -> Option<DeadLetterEntry> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).pop_front()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Priority;

    fn entry(tag: &str) -> DeadLetterEntry {
        DeadLetterEntry {
            event: Event::new(tag, vec![], Priority::Normal),
            reason: "boom".into(),
            attempts: 3,
            dead_lettered_at: SystemTime::now(),
        }
    }

    #[test]
    fn push_and_read_back() {
        let dlq = DeadLetterQueue::new(10, DlqOverflowPolicy::DropNewest);
        dlq.push(entry("a"));
        dlq.push(entry("b"));
        assert_eq!(dlq.len(), 2);
        assert_eq!(dlq.entries()[0].event.event_type, "a");
    }

    #[test]
    fn drop_newest_refuses_incoming_when_full() {
        let dlq = DeadLetterQueue::new(2, DlqOverflowPolicy::DropNewest);
        dlq.push(entry("a"));
        dlq.push(entry("b"));
        dlq.push(entry("c"));

        assert_eq!(dlq.len(), 2);
        assert_eq!(dlq.dropped(), 1);
        let types: Vec<_> = dlq.entries().iter().map(|e| e.event.event_type.clone()).collect();
        assert_eq!(types, vec!["a", "b"]);
    }

    #[test]
    fn drop_oldest_evicts_front_when_full() {
        let dlq = DeadLetterQueue::new(2, DlqOverflowPolicy::DropOldest);
        dlq.push(entry("a"));
        dlq.push(entry("b"));
        dlq.push(entry("c"));

        assert_eq!(dlq.len(), 2);
        assert_eq!(dlq.dropped(), 1);
        let types: Vec<_> = dlq.entries().iter().map(|e| e.event.event_type.clone()).collect();
        assert_eq!(types, vec!["b", "c"]);
    }

    #[test]
    fn pop_oldest_removes_and_returns() {
        let dlq = DeadLetterQueue::new(10, DlqOverflowPolicy::DropNewest);
        dlq.push(entry("a"));
        dlq.push(entry("b"));
        let popped = dlq.pop_oldest().unwrap();
        assert_eq!(popped.event.event_type, "a");
        assert_eq!(dlq.len(), 1);
    }
}
