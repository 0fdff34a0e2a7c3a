//! Async event bus.
//!
//! Handlers for one event run sequentially in subscription order; `emit`
//! awaits each handler before starting the next and resolves only after
//! the last one. The first handler error aborts the emission and
//! propagates to the emitter.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::events::AppEvent;

/// A subscribed handler.
pub type EventHandler = Arc<dyn Fn(AppEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Identifies one subscription; returned by [`EventBus::on`] and consumed
/// by [`EventBus::off_handler`] to remove exactly that handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<String, Vec<(HandlerId, EventHandler)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to an event name.
    pub fn on<F, Fut>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(AppEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        let handler: EventHandler = Arc::new(move |event| Box::pin(handler(event)));
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove every handler for an event.
    pub fn off(&mut self, event: &str) {
        self.handlers.remove(event);
    }

    /// Remove exactly one handler. Returns whether it was subscribed.
    pub fn off_handler(&mut self, event: &str, id: HandlerId) -> bool {
        match self.handlers.get_mut(event) {
            Some(list) => {
                let before = list.len();
                list.retain(|(hid, _)| *hid != id);
                before != list.len()
            }
            None => false,
        }
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    /// Emit an event: await every subscribed handler in subscription
    /// order, sequentially. The first error aborts and propagates.
    pub async fn emit(&self, event: &AppEvent) -> anyhow::Result<()> {
        let list: Vec<EventHandler> = match self.handlers.get(event.name()) {
            Some(list) => list.iter().map(|(_, h)| h.clone()).collect(),
            None => return Ok(()),
        };
        debug!(event = event.name(), handlers = list.len(), "emit");
        for handler in list {
            handler(event.clone()).await?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
