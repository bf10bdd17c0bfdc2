//! Event bus for subscriber dispatch
//!
//! Emission never runs a handler inline. Events are queued to a
//! dispatcher task, which invokes handlers in emission order and then in
//! registration order. A panicking handler is logged and skipped.

use crate::event::{EventName, WatchEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Subscriber callback
pub type Handler = Arc<dyn Fn(&WatchEvent) + Send + Sync>;

struct Dispatch {
    handlers: Vec<Handler>,
    event: WatchEvent,
}

/// Named-event listener table plus dispatcher
pub struct EventBus {
    /// Append-only listener table
    listeners: RwLock<HashMap<EventName, Vec<Handler>>>,

    /// Channel subscribers receiving every event
    subscribers: Mutex<Vec<mpsc::UnboundedSender<WatchEvent>>>,

    dispatch_tx: mpsc::UnboundedSender<Dispatch>,
}

impl EventBus {
    /// Create a bus and spawn its dispatcher
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_loop(dispatch_rx));

        Self {
            listeners: RwLock::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            dispatch_tx,
        }
    }

    /// Append a handler for `name`
    pub fn on<F>(&self, name: EventName, handler: F)
    where
        F: Fn(&WatchEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry(name)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Receive every emitted event on a channel
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Number of handlers registered for `name`
    pub fn listener_count(&self, name: EventName) -> usize {
        self.listeners.read().get(&name).map_or(0, Vec::len)
    }

    /// Schedule delivery of `event` to its listeners
    pub fn emit(&self, event: WatchEvent) {
        trace!("emit {} {:?}", event.name(), event.path());

        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());

        let handlers = match self.listeners.read().get(&event.name()) {
            Some(handlers) if !handlers.is_empty() => handlers.clone(),
            _ => return,
        };

        // Dispatcher only stops when the bus itself is dropped
        let _ = self.dispatch_tx.send(Dispatch { handlers, event });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn dispatch_loop(mut rx: mpsc::UnboundedReceiver<Dispatch>) {
    while let Some(Dispatch { handlers, event }) = rx.recv().await {
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                warn!("Handler for '{}' panicked", event.name());
            }
        }
    }
}
