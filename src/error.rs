//! Error taxonomy for the event bus (spec §7).

use std::fmt;

/// Every error kind the engine can surface, as a structured enum rather than a
/// stringly-typed message — mirrors the donor resilience crate's
/// `ResilienceError<E>` shape (structured variants, `Display`, `source()`).
#[derive(Debug, Clone)]
pub enum EngineError {
    /// A config option violated its constraint at `initialize()`.
    ConfigurationInvalid { reason: String },
    /// `emit()` was called on a disabled engine.
    Disabled,
    /// `emit()` was called while the engine is draining/shutting down.
    Draining,
    /// `emit()` was called before `initialize()` succeeded.
    NotInitialized,
    /// Admission was rejected because the queue is at capacity.
    QueueFull { capacity: usize },
    /// The serialized event exceeds `maxEventSize`.
    EventTooLarge { size: usize, max: usize },
    /// The serializer could not decode a dequeued or submitted buffer.
    MalformedEvent { reason: String },
    /// No handler is registered for the event's type.
    NoHandler { event_type: String },
    /// A handler invocation failed but may be retried.
    HandlerRetryable { reason: String },
    /// A handler signalled a non-retryable failure via the terminal marker.
    HandlerTerminal { reason: String },
    /// `maxRetries` was reached without a successful invocation.
    RetriesExhausted { attempts: u32, last_error: String },
    /// An unhandled fault in the worker loop itself (not the handler).
    WorkerFault { reason: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationInvalid { reason } => {
                write!(f, "configuration invalid: {reason}")
            }
            Self::Disabled => write!(f, "engine is disabled"),
            Self::Draining => write!(f, "engine is draining, admission rejected"),
            Self::NotInitialized => write!(f, "engine is not initialized"),
            Self::QueueFull { capacity } => {
                write!(f, "queue full (capacity {capacity})")
            }
            Self::EventTooLarge { size, max } => {
                write!(f, "event too large ({size} bytes, max {max})")
            }
            Self::MalformedEvent { reason } => write!(f, "malformed event: {reason}"),
            Self::NoHandler { event_type } => {
                write!(f, "no handler registered for event type '{event_type}'")
            }
            Self::HandlerRetryable { reason } => write!(f, "handler failed (retryable): {reason}"),
            Self::HandlerTerminal { reason } => write!(f, "handler failed (terminal): {reason}"),
            Self::RetriesExhausted { attempts, last_error } => {
                write!(f, "retries exhausted after {attempts} attempts, last error: {last_error}")
            }
            Self::WorkerFault { reason } => write!(f, "worker fault: {reason}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    pub fn is_queue_full(&self) -> bool {
        matches!(self, Self::QueueFull { .. })
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }

    pub fn is_draining(&self) -> bool {
        matches!(self, Self::Draining)
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::HandlerTerminal { .. })
    }
}

/// Outcome a handler returns to signal retry policy (spec §4.3/§7).
///
/// `Terminal` is the "designated terminal marker" spec.md calls for: a
/// handler that knows a failure can never succeed on retry (e.g. a
/// validation error) returns this instead of `Retryable` to skip straight
/// to the dead-letter queue.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    Retryable(String),
    Terminal(String),
}

impl fmt::Display for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retryable(msg) => write!(f, "{msg}"),
            Self::Terminal(msg) => write!(f, "{msg}"),
        }
    }
}

impl HandlerOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(msg) | Self::Terminal(msg) => msg,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}
