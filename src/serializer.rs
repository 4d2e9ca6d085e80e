//! Event (de)serialization to a compact byte form bounded by `MaxEventSize` (spec §4.2).

use crate::error::EngineError;
use crate::event::{Event, Priority};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Wire representation of an `Event`. `SystemTime` and `Uuid` are not
/// directly `serde`-friendly in the shapes we want on the wire, so this
/// mirrors `Event` with primitive fields only.
#[derive(Serialize, Deserialize)]
struct WireEvent {
    event_id: String,
    event_type: String,
    payload: Vec<u8>,
    priority: WirePriority,
    timestamp_millis: u64,
    attempt: u32,
    correlation_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
enum WirePriority {
    Critical,
    Normal,
    Low,
}

impl From<Priority> for WirePriority {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Critical => WirePriority::Critical,
            Priority::Normal => WirePriority::Normal,
            Priority::Low => WirePriority::Low,
        }
    }
}

impl From<WirePriority> for Priority {
    fn from(p: WirePriority) -> Self {
        match p {
            WirePriority::Critical => Priority::Critical,
            WirePriority::Normal => Priority::Normal,
            WirePriority::Low => Priority::Low,
        }
    }
}

/// Encode an event to bytes, rejecting anything that would exceed `max_event_size`.
///
/// Contract (spec §4.2): `encode(decode(b)) == b` for well-formed `b`.
pub fn encode(event: &Event, max_event_size: usize) -> Result<Vec<u8>, EngineError> {
    if event.event_type.is_empty() {
        return Err(EngineError::MalformedEvent { reason: "event_type is empty".into() });
    }

    let wire = WireEvent {
        event_id: event.event_id.to_string(),
        event_type: event.event_type.clone(),
        payload: event.payload.clone(),
        priority: event.priority.into(),
        timestamp_millis: event.timestamp_millis(),
        attempt: event.attempt,
        correlation_id: event.correlation_id.clone(),
    };

    let bytes = serde_json::to_vec(&wire)
        .map_err(|e| EngineError::MalformedEvent { reason: e.to_string() })?;

    if bytes.len() > max_event_size {
        return Err(EngineError::EventTooLarge { size: bytes.len(), max: max_event_size });
    }

    Ok(bytes)
}

/// Decode bytes back into an `Event`. Rejects truncated, malformed, or
/// oversize buffers with a recoverable error (spec §4.2).
pub fn decode(bytes: &[u8], max_event_size: usize) -> Result<Event, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::MalformedEvent { reason: "empty buffer".into() });
    }
    if bytes.len() > max_event_size {
        return Err(EngineError::EventTooLarge { size: bytes.len(), max: max_event_size });
    }

    let wire: WireEvent = serde_json::from_slice(bytes)
        .map_err(|e| EngineError::MalformedEvent { reason: e.to_string() })?;

    let event_id = Uuid::parse_str(&wire.event_id)
        .map_err(|e| EngineError::MalformedEvent { reason: e.to_string() })?;

    Ok(Event {
        event_id,
        event_type: wire.event_type,
        payload: wire.payload,
        priority: wire.priority.into(),
        timestamp: UNIX_EPOCH + Duration::from_millis(wire.timestamp_millis),
        attempt: wire.attempt,
        correlation_id: wire.correlation_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 4096;

    #[test]
    fn round_trip_preserves_fields() {
        let event = Event::new("t.ok", vec![1, 2, 3, 4], Priority::Critical)
            .with_correlation_id("corr-42");
        let bytes = encode(&event, MAX).unwrap();
        let decoded = decode(&bytes, MAX).unwrap();

        assert_eq!(decoded.event_id, event.event_id);
        assert_eq!(decoded.event_type, event.event_type);
        assert_eq!(decoded.payload, event.payload);
        assert_eq!(decoded.priority, event.priority);
        assert_eq!(decoded.attempt, event.attempt);
        assert_eq!(decoded.correlation_id, event.correlation_id);
    }

    #[test]
    fn encode_decode_is_byte_stable() {
        let event = Event::new("t.ok", vec![9, 9], Priority::Low);
        let bytes = encode(&event, MAX).unwrap();
        let decoded = decode(&bytes, MAX).unwrap();
        let re_encoded = encode(&decoded, MAX).unwrap();
        assert_eq!(bytes, re_encoded);
    }

    #[test]
    fn encode_rejects_oversize_payload() {
        let event = Event::new("t.ok", vec![0u8; 10_000], Priority::Normal);
        let err = encode(&event, 1024).unwrap_err();
        assert!(matches!(err, EngineError::EventTooLarge { .. }));
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        let event = Event::new("t.ok", vec![1, 2, 3], Priority::Normal);
        let mut bytes = encode(&event, MAX).unwrap();
        bytes.truncate(bytes.len() / 2);
        let err = decode(&bytes, MAX).unwrap_err();
        assert!(matches!(err, EngineError::MalformedEvent { .. }));
    }

    #[test]
    fn decode_rejects_empty_buffer() {
        let err = decode(&[], MAX).unwrap_err();
        assert!(matches!(err, EngineError::MalformedEvent { .. }));
    }

    #[test]
    fn encode_rejects_empty_type() {
        let event = Event::new("", vec![1], Priority::Normal);
        let err = encode(&event, MAX).unwrap_err();
        assert!(matches!(err, EngineError::MalformedEvent { .. }));
    }
}
