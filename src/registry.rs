//! Handler registry: an in-process table mapping event type to handler
//! (spec §4.1). Registration is latest-wins; there is no handler discovery
//! or code-shipping involved, only a lookup table the engine consults on
//! dispatch.

use crate::error::HandlerOutcome;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A handler for one event type.
///
/// Returns `Ok(())` on success, `Err(HandlerOutcome::Retryable)` for a
/// transient failure the retry engine should retry, or
/// `Err(HandlerOutcome::Terminal)` for a failure that retrying cannot fix.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerOutcome>;
}

/// Wraps a plain async closure as an `EventHandler`, for call sites that
/// don't want to define a named type.
pub struct FnHandler<F>(F);

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(&[u8]) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), HandlerOutcome>> + Send,
{
    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerOutcome> {
        (self.0)(payload).await
    }
}

/// The in-process event-type-to-handler table. Cloning shares the
/// underlying map (`Arc<RwLock<_>>`), matching the donor's registry types
/// used for circuit-breaker-per-key lookup.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn EventHandler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `event_type`. A later registration for the
    /// same type replaces the earlier one (spec §4.1: latest wins).
    pub fn register(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let mut guard = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        guard.insert(event_type.into(), handler);
    }

    /// Remove the handler for `event_type`, if any.
    pub fn unregister(&self, event_type: &str) -> bool {
        let mut guard = self.handlers.write().unwrap_or_else(|p| p.into_inner());
        guard.remove(event_type).is_some()
    }

    pub fn get(&self, event_type: &str) -> Option<Arc<dyn EventHandler>> {
        let guard = self.handlers.read().unwrap_or_else(|p| p.into_inner());
        guard.get(event_type).cloned()
    }

    pub fn contains(&self, event_type: &str) -> bool {
        let guard = self.handlers.read().unwrap_or_else(|p| p.into_inner());
        guard.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        let guard = self.handlers.read().unwrap_or_else(|p| p.into_inner());
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
