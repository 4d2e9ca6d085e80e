//! Event data model (spec §3).

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Priority class. `Ord`-derived so `Critical > Normal > Low`, matching
/// spec §3's ordered enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Normal,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    /// All priorities in drain order (highest first), for worker loops
    /// implementing spec §4.5 Design A.
    pub const ORDERED: [Priority; 3] = [Priority::Critical, Priority::Normal, Priority::Low];
}

/// An event moving through the bus (spec §3).
///
/// `event_id` is assigned once at `emit()` and is the identity spec §6's
/// `EventId` refers to — it is carried unchanged across every retry and
/// re-enqueue, while `attempt` increments on each one.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: Uuid,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub priority: Priority,
    pub timestamp: SystemTime,
    pub attempt: u32,
    pub correlation_id: Option<String>,
}

impl Event {
    /// Construct a fresh event at attempt 0 (spec §3 invariant: "attempt
    /// starts at 0 and increases only by retry").
    pub fn new(event_type: impl Into<String>, payload: Vec<u8>, priority: Priority) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            priority,
            timestamp: SystemTime::now(),
            attempt: 0,
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Clone this event with `attempt` incremented, preserving
    /// `event_id`/`priority`/`correlation_id` as spec §4.3 requires on
    /// retry re-enqueue.
    pub fn next_attempt(&self) -> Self {
        let mut next = self.clone();
        next.attempt += 1;
        next
    }

    /// Time since emission, for queue-wait metrics (spec §4.8).
    pub fn age(&self) -> std::time::Duration {
        self.timestamp.elapsed().unwrap_or_default()
    }

    pub fn timestamp_millis(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
