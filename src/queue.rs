//! Bounded shared queue: one lane per priority class, drained in strict
//! priority order (spec §4.5 Design A).
//!
//! Each lane is a fixed-capacity slot array. Admission reserves a slot with
//! an atomic index/count handshake, then writes a length-prefixed buffer
//! into that slot's short-lived `Mutex` — never held across a handler
//! invocation, only across the memcpy into/out of the slot. This is the
//! two-step model: step one claims the slot atomically, step two validates
//! the length header before handing bytes back to the caller. A slot whose
//! header is zero or exceeds `max_event_size` is corrupt and is skipped
//! rather than returned, so one bad write can never wedge a lane.

use crate::error::EngineError;
use crate::event::Priority;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A single priority lane: a ring of slots guarded by atomic indices.
struct Lane {
    slots: Vec<Mutex<Vec<u8>>>,
    capacity: usize,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
    count: AtomicUsize,
    corrupted: AtomicU64,
}

impl Lane {
    fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Mutex::new(Vec::new()));
        Self {
            slots,
            capacity,
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        corrupted: AtomicU64::new(0),
        }
    }

    /// Reserve a slot and write `bytes` (already length-prefixed) into it.
    /// Returns `false` if the lane is at capacity.
    fn push(&self, framed: Vec<u8>) -> bool {
        loop {
            let current = self.count.load(Ordering::Acquire);
            if current >= self.capacity {
                return false;
            }
            if self
                .count
                .compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        let index = self.write_index.fetch_add(1, Ordering::AcqRel) % self.capacity;
        let mut slot = self.slots[index].lock().unwrap_or_else(|p| p.into_inner());
        *slot = framed;
        true
    }

    /// Pop the next framed slot, skipping (and counting) any corrupted
    /// header until a valid payload is found or the lane runs dry.
    fn pop(&self, max_event_size: usize) -> Option<Vec<u8>> {
        loop {
            let current = self.count.load(Ordering::Acquire);
            if current == 0 {
                return None;
            }
            if self
                .count
                .compare_exchange_weak(current, current - 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                continue;
            }

            let index = self.read_index.fetch_add(1, Ordering::AcqRel) % self.capacity;
            let framed = {
                let mut slot = self.slots[index].lock().unwrap_or_else(|p| p.into_inner());
                std::mem::take(&mut *slot)
            };

            match unframe(&framed, max_event_size) {
                Some(payload) => return Some(payload),
                None => {
                    self.corrupted.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    fn corrupted_count(&self) -> u64 {
        self.corrupted.load(Ordering::Relaxed)
    }
}

const HEADER_LEN: usize = 4;

fn frame(bytes: &[u8]) -> Vec<u8> {
    let len = bytes.len() as u32;
    let mut framed = Vec::with_capacity(HEADER_LEN + bytes.len());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend_from_slice(bytes);
    framed
}

fn unframe(framed: &[u8], max_event_size: usize) -> Option<Vec<u8>> {
    if framed.len() < HEADER_LEN {
        return None;
    }
    let mut len_bytes = [0u8; HEADER_LEN];
    len_bytes.copy_from_slice(&framed[..HEADER_LEN]);
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len == 0 || len > max_event_size {
        return None;
    }
    if framed.len() != HEADER_LEN + len {
        return None;
    }

    Some(framed[HEADER_LEN..].to_vec())
}

/// The bounded, priority-ordered queue shared between `emit()` callers and
/// the worker pool.
pub struct SharedQueue {
    critical: Lane,
    normal: Lane,
    low: Lane,
    max_event_size: usize,
}

impl SharedQueue {
    /// `capacity` is the per-lane capacity; total buffered events can reach
    /// up to `3 * capacity` across all three priorities, matching the
    /// donor's preference for explicit, inspectable bounds over one shared
    /// counter split three ways.
    pub fn new(capacity: usize, max_event_size: usize) -> Self {
        Self {
            critical: Lane::new(capacity),
            normal: Lane::new(capacity),
            low: Lane::new(capacity),
            max_event_size,
        }
    }

    /// Admit a pre-serialized event into its priority lane.
    pub fn enqueue(&self, priority: Priority, bytes: Vec<u8>) -> Result<(), EngineError> {
        let lane = self.lane(priority);
        let framed = frame(&bytes);
        if lane.push(framed) {
            Ok(())
        } else {
            Err(EngineError::QueueFull { capacity: lane.capacity })
        }
    }

    /// Dequeue the next event across all lanes, Critical first, then
    /// Normal, then Low (spec §4.5 Design A).
    pub fn dequeue(&self) -> Option<Vec<u8>> {
        for priority in Priority::ORDERED {
            if let Some(bytes) = self.lane(priority).pop(self.max_event_size) {
                return Some(bytes);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lane_len(&self, priority: Priority) -> usize {
        self.lane(priority).len()
    }

    pub fn corrupted_count(&self) -> u64 {
        self.critical.corrupted_count() + self.normal.corrupted_count() + self.low.corrupted_count()
    }

    fn lane(&self, priority: Priority) -> &Lane {
        match priority {
            Priority::Critical => &self.critical,
            Priority::Normal => &self.normal,
            Priority::Low => &self.low,
        }
    }
}
