//! Name-keyed event dispatcher.
//!
//! Both network clients hand their events to a [`Dispatcher`]: a mapping
//! from event name to a single async callback. Unhandled events are dropped
//! with a warning — the protocol engines must not assume every event kind is
//! consumed — and a failing handler is logged and isolated so it can never
//! take down a connection loop.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use tracing::{error, warn};

use crate::error::HandlerResult;

/// An event that can be routed by name.
pub trait NamedEvent {
    /// Dispatch key for this event.
    fn name(&self) -> &'static str;
}

impl NamedEvent for tgbridge_proto::SessionEvent {
    fn name(&self) -> &'static str {
        // The inherent method, not a recursive trait call.
        tgbridge_proto::SessionEvent::name(self)
    }
}

type Handler<E> = Box<dyn Fn(E) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A registry of named event callbacks.
pub struct Dispatcher<E> {
    handlers: HashMap<&'static str, Handler<E>>,
}

impl<E: NamedEvent> Dispatcher<E> {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the callback for an event name, replacing any previous one.
    pub fn on<F>(&mut self, name: &'static str, handler: F)
    where
        F: Fn(E) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static,
    {
        self.handlers.insert(name, Box::new(handler));
    }

    /// Route an event to its callback.
    pub async fn dispatch(&self, event: E) {
        let name = event.name();
        match self.handlers.get(name) {
            None => warn!(event = name, "unhandled event"),
            Some(handler) => {
                if let Err(e) = handler(event).await {
                    error!(event = name, error = %e, "event handler failed");
                }
            }
        }
    }
}

impl<E: NamedEvent> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}
